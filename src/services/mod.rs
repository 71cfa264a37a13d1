//! Business logic services layer

pub mod account_service;
pub mod audit_service;
pub mod auth_service;
pub mod department_service;
pub mod employee_service;
pub mod identity_service;
pub mod job_title_service;
pub mod storage_service;

pub use account_service::AccountService;
pub use audit_service::{AuditAction, AuditEntry, AuditService};
pub use auth_service::AuthService;
pub use department_service::DepartmentService;
pub use employee_service::EmployeeService;
pub use identity_service::{bootstrap_admin, IdentityProvider, PgIdentityProvider};
pub use job_title_service::JobTitleService;
pub use storage_service::StorageService;
