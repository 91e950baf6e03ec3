//! HTTP 处理器模块

pub mod auth;
pub mod grade;
pub mod health;
pub mod student;
