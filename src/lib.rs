//! 人事管理服务库
//! 员工、部门、职位、审计日志、报表导出与账户管理

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod query;
pub mod report;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
