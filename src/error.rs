//! 统一错误模型
//! 定义所有错误类型和错误响应格式

use std::collections::BTreeMap;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::report::ReportError;
use crate::services::storage_service::StorageError;

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

/// 按字段聚合的校验错误，序列化为 `{"field": ["message", ...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// 没有错误时返回 Ok，否则返回 AppError::Validation
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, list) in errors.field_errors() {
            for e in list {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                out.add(field.to_string(), message);
            }
        }
        out
    }
}

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    #[error("Account locked out")]
    AccountLocked,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Duplicate value for {field}: {message}")]
    DuplicateKey { field: String, message: String },

    #[error("Referential block: {0}")]
    ReferentialBlock(String),

    #[error("Record was modified by another user")]
    ConcurrencyConflict,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::AccountLocked => StatusCode::LOCKED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DuplicateKey { .. }
            | AppError::ReferentialBlock(_)
            | AppError::ConcurrencyConflict => StatusCode::CONFLICT,
            AppError::Database(_)
            | AppError::Config(_)
            | AppError::Storage(_)
            | AppError::Report(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized => "Authentication failed".to_string(),
            AppError::Forbidden => "Access denied".to_string(),
            AppError::AccountLocked => {
                "Account locked out. Please try again later.".to_string()
            }
            AppError::NotFound(msg) => format!("Resource not found: {}", msg),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Validation(_) => "One or more fields are invalid".to_string(),
            AppError::DuplicateKey { message, .. } => message.clone(),
            AppError::ReferentialBlock(msg) => msg.clone(),
            AppError::ConcurrencyConflict => {
                "The record was modified by another user. Reload and try again.".to_string()
            }
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Storage(_) => "File storage error".to_string(),
            AppError::Report(_) => "Report generation failed".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }

    /// 字段级错误（校验失败、唯一键冲突）
    pub fn fields(&self) -> Option<FieldErrors> {
        match self {
            AppError::Validation(errors) => Some(errors.clone()),
            AppError::DuplicateKey { field, message } => {
                Some(FieldErrors::single(field.clone(), message.clone()))
            }
            _ => None,
        }
    }

    // 便捷方法
    pub fn not_found(msg: &str) -> Self {
        AppError::NotFound(msg.to_string())
    }

    pub fn duplicate(field: &str, message: &str) -> Self {
        AppError::DuplicateKey {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// 唯一索引名称 -> (字段, 提示信息)
fn unique_constraint_field(constraint: &str) -> (&'static str, &'static str) {
    match constraint {
        "ux_employees_email" => ("email", "An employee with this email already exists."),
        "ux_employees_user_id" => ("user_id", "This login is already linked to another employee."),
        "ux_departments_name" => ("name", "A department with this name already exists."),
        "ux_job_titles_title" => ("title", "A job title with this name already exists."),
        "ux_users_email" => ("email", "This email is already in use by another account."),
        _ => ("record", "A record with the same value already exists."),
    }
}

/// 数据库错误转换：唯一约束 (23505) 与外键约束 (23503) 映射为业务错误
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            match db_err.code().as_deref() {
                Some("23505") => {
                    let (field, message) =
                        unique_constraint_field(db_err.constraint().unwrap_or_default());
                    return AppError::duplicate(field, message);
                }
                Some("23503") => {
                    return AppError::ReferentialBlock(
                        "The record is still referenced by other records.".to_string(),
                    );
                }
                _ => {}
            }
        }
        AppError::Database(e)
    }
}

/// 错误响应 DTO
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.code(),
                message: self.user_message(),
                request_id,
                fields: self.fields(),
            },
        };

        // 服务端错误记 error，客户端错误记 warn
        if status.is_server_error() {
            tracing::error!(
                code = self.code(),
                message = %self,
                request_id = %error_response.error.request_id,
                "Application error"
            );
        } else {
            tracing::warn!(
                code = self.code(),
                message = %self,
                request_id = %error_response.error.request_id,
                "Request rejected"
            );
        }

        (status, Json(error_response)).into_response()
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::Unauthorized.code(), 401);
        assert_eq!(AppError::Forbidden.code(), 403);
        assert_eq!(AppError::NotFound("test".to_string()).code(), 404);
        assert_eq!(AppError::BadRequest("test".to_string()).code(), 400);
        assert_eq!(AppError::AccountLocked.code(), 423);
        assert_eq!(AppError::ConcurrencyConflict.code(), 409);
        assert_eq!(AppError::Validation(FieldErrors::new()).code(), 422);
    }

    #[test]
    fn test_user_message_no_sensitive_info() {
        let error = AppError::Database(sqlx::Error::RowNotFound);
        let message = error.user_message();
        assert_eq!(message, "Database error occurred");
        assert!(!message.contains("sqlx"));
    }

    #[test]
    fn test_duplicate_key_exposes_field() {
        let error = AppError::duplicate("email", "taken");
        let fields = error.fields().unwrap();
        assert_eq!(fields.get("email"), Some(&["taken".to_string()][..]));
    }

    #[test]
    fn test_field_errors_into_result() {
        assert!(FieldErrors::new().into_result().is_ok());

        let mut errors = FieldErrors::new();
        errors.add("salary", "Salary must be between 0.01 and 9,999,999.99");
        errors.add("salary", "second");
        match errors.into_result() {
            Err(AppError::Validation(e)) => assert_eq!(e.get("salary").unwrap().len(), 2),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_constraint_falls_back() {
        assert_eq!(unique_constraint_field("whatever").0, "record");
        assert_eq!(unique_constraint_field("ux_departments_name").0, "name");
    }
}
