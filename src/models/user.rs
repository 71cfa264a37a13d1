//! User (login identity) domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AccessToken, Role};

/// User account
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub email_confirmed: bool,

    // Lockout state
    pub lockout_enabled: bool,
    pub lockout_end: Option<DateTime<Utc>>,
    pub access_failed_count: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        self.lockout_enabled && matches!(self.lockout_end, Some(end) if end > now)
    }
}

/// Data needed to create a login
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub email_confirmed: bool,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Successful login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
}

/// Linked employee reference
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LinkedEmployee {
    pub id: Uuid,
    pub full_name: String,
    pub department_name: String,
    pub job_title: String,
}

/// Row of the user administration list
#[derive(Debug, Clone, Serialize)]
pub struct UserListItem {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub roles: Vec<Role>,
    pub email_confirmed: bool,
    pub lockout_enabled: bool,
    pub is_locked_out: bool,
    /// 审计日志统计的失败次数（最近一次清零之后）
    pub failed_login_count: i64,
    pub last_login: Option<DateTime<Utc>>,
    pub linked_employee: Option<LinkedEmployee>,
}

/// The signed-in user's profile
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub phone: Option<String>,
    pub email_confirmed: bool,
    pub roles: Vec<Role>,
    pub employee: Option<LinkedEmployee>,
}

/// Profile update response; a new token is issued when the email changed
#[derive(Debug, Serialize)]
pub struct UpdatedProfile {
    #[serde(flatten)]
    pub profile: UserProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<AccessToken>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(
        email(message = "Invalid email address"),
        length(max = 256, message = "Email cannot exceed 256 characters")
    )]
    pub email: String,
    #[validate(length(max = 20, message = "Invalid phone number"))]
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "The new password and confirmation password do not match."))]
    pub confirm_password: String,
}

/// One login-history or activity line
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActivityItem {
    pub action: String,
    pub occurred_at: DateTime<Utc>,
    pub details: Option<String>,
}

/// Login counters derived from the audit log
#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct LoginStats {
    /// 最近一次清零之后的失败次数
    pub failed_since_reset: i64,
    pub total_successful: i64,
    pub last_successful: Option<DateTime<Utc>>,
    pub last_failed: Option<DateTime<Utc>>,
}

/// Account security view
#[derive(Debug, Clone, Serialize)]
pub struct SecurityView {
    pub id: Uuid,
    pub email: String,
    pub email_confirmed: bool,
    pub lockout_enabled: bool,
    pub lockout_end: Option<DateTime<Utc>>,
    /// 身份存储中的失败计数
    pub access_failed_count: i32,
    pub failed_attempts_since_reset: i64,
    pub total_successful_logins: i64,
    pub last_successful_login: Option<DateTime<Utc>>,
    pub last_failed_login: Option<DateTime<Utc>>,
    pub login_history: Vec<ActivityItem>,
    pub recent_activity: Vec<ActivityItem>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LinkEmployeeRequest {
    pub employee_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(lockout_end: Option<DateTime<Utc>>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@b.c".to_string(),
            username: "a@b.c".to_string(),
            password_hash: String::new(),
            phone: None,
            email_confirmed: true,
            lockout_enabled: true,
            lockout_end,
            access_failed_count: 0,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_is_locked_out() {
        let now = Utc::now();
        assert!(!user(None).is_locked_out(now));
        assert!(user(Some(now + Duration::minutes(5))).is_locked_out(now));
        assert!(!user(Some(now - Duration::seconds(1))).is_locked_out(now));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(user(None)).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_change_password_confirmation() {
        let req = ChangePasswordRequest {
            current_password: "Old@1234".to_string(),
            new_password: "New@1234".to_string(),
            confirm_password: "New@12345".to_string(),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("confirm_password"));
    }
}
