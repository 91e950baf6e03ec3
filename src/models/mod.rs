//! 数据模型模块

pub mod auth;
pub mod student;
pub mod user;
