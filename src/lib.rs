//! 学生成绩管理服务
//! 学生/成绩 CRUD 与基于 JWT 的认证

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
