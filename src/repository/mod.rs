//! Database repository layer

pub mod student_repo;
pub mod user_repo;

pub use student_repo::*;
pub use user_repo::*;
