//! 数据模型模块

pub mod audit;
pub mod department;
pub mod employee;
pub mod job_title;
pub mod options;
pub mod user;
