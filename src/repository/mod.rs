//! Database repository layer

pub mod audit_repo;
pub mod department_repo;
pub mod employee_repo;
pub mod job_title_repo;
pub mod user_repo;

pub use audit_repo::{AuditRepository, NewAuditLog};
pub use department_repo::DepartmentRepository;
pub use employee_repo::EmployeeRepository;
pub use job_title_repo::JobTitleRepository;
pub use user_repo::UserRepository;
