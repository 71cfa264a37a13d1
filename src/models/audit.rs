//! Audit domain models

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::options::AuditLogFilterOptions;
use crate::query::{empty_as_none, Page, SortDirection, SortKey};

pub const AUDIT_PAGE_SIZE: i64 = 25;

/// Security-relevant action labels
pub mod actions {
    pub const LOGIN_SUCCESSFUL: &str = "Login Successful";
    pub const LOGIN_FAILED: &str = "Login Failed";
    pub const ACCOUNT_LOCKED_OUT: &str = "Account Locked Out";
    /// 失败次数清零标记：统计只计算最近一次标记之后的失败
    pub const LOGIN_FAILED_RESET: &str = "Login Failed Reset";
    pub const UPDATED_PROFILE: &str = "Updated profile";
    pub const CHANGED_PASSWORD: &str = "Changed password";

    pub const LOGIN_HISTORY: [&str; 4] = [
        LOGIN_SUCCESSFUL,
        LOGIN_FAILED,
        LOGIN_FAILED_RESET,
        ACCOUNT_LOCKED_OUT,
    ];
}

/// Audit log row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub action: String,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
    pub details: Option<String>,
    pub employee_id: Option<Uuid>,
}

/// Audit log row joined with the referenced employee's name
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub action: String,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
    pub details: Option<String>,
    pub employee_id: Option<Uuid>,
    pub employee_name: Option<String>,
}

/// Entry as shown in lists and reports, with derived classification
#[derive(Debug, Clone, Serialize)]
pub struct AuditLogView {
    #[serde(flatten)]
    pub entry: AuditLogEntry,
    pub action_type: ActionType,
    pub entity_type: EntityType,
}

impl From<AuditLogEntry> for AuditLogView {
    fn from(entry: AuditLogEntry) -> Self {
        let action_type = ActionType::classify(&entry.action);
        let entity_type = EntityType::classify(&entry.action);
        Self {
            entry,
            action_type,
            entity_type,
        }
    }
}

/// Action classification derived from the action text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActionType {
    Created,
    Updated,
    Deleted,
    Deactivated,
    Other,
}

impl ActionType {
    pub const FILTERABLE: [&'static str; 4] = ["Created", "Updated", "Deleted", "Deactivated"];

    /// 按 Created、Updated、Deleted、Deactivated 的顺序做不区分大小写的包含匹配
    pub fn classify(action: &str) -> Self {
        let lower = action.to_lowercase();
        if lower.contains("created") {
            ActionType::Created
        } else if lower.contains("updated") {
            ActionType::Updated
        } else if lower.contains("deleted") {
            ActionType::Deleted
        } else if lower.contains("deactivated") {
            ActionType::Deactivated
        } else {
            ActionType::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Created => "Created",
            ActionType::Updated => "Updated",
            ActionType::Deleted => "Deleted",
            ActionType::Deactivated => "Deactivated",
            ActionType::Other => "Other",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity classification derived from the action text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityType {
    Employee,
    Department,
    #[serde(rename = "Job Title")]
    JobTitle,
    System,
}

impl EntityType {
    pub const FILTERABLE: [&'static str; 3] = ["Employee", "Department", "Job Title"];

    pub fn classify(action: &str) -> Self {
        let lower = action.to_lowercase();
        if lower.contains("employee") {
            EntityType::Employee
        } else if lower.contains("department") {
            EntityType::Department
        } else if lower.contains("job title") {
            EntityType::JobTitle
        } else {
            EntityType::System
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Employee => "Employee",
            EntityType::Department => "Department",
            EntityType::JobTitle => "Job Title",
            EntityType::System => "System",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit log list query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogFilter {
    #[serde(default)]
    pub search: Option<String>,
    /// 精确匹配操作者
    #[serde(default)]
    pub actor: Option<String>,
    /// 操作文本中包含的子串，例如 "Created"
    #[serde(default)]
    pub action_type: Option<String>,
    /// 操作文本中包含的子串，例如 "Job Title"
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLogSort {
    Timestamp,
    User,
    Action,
}

impl SortKey for AuditLogSort {
    const DEFAULT: Self = AuditLogSort::Timestamp;
    const DEFAULT_DIRECTION: SortDirection = SortDirection::Desc;
    const TIE_BREAKER: &'static str = "a.id";

    fn parse(key: &str) -> Option<Self> {
        match key {
            "timestamp" => Some(AuditLogSort::Timestamp),
            "user" => Some(AuditLogSort::User),
            "action" => Some(AuditLogSort::Action),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            AuditLogSort::Timestamp => "a.occurred_at",
            AuditLogSort::User => "a.actor",
            AuditLogSort::Action => "a.action",
        }
    }
}

/// Unfiltered audit counts
#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct AuditLogStats {
    pub total: i64,
    pub today: i64,
    pub this_week: i64,
}

#[derive(Debug, Serialize)]
pub struct AuditLogListResponse {
    pub logs: Page<AuditLogView>,
    pub stats: AuditLogStats,
    pub options: AuditLogFilterOptions,
}

/// Result of a retention purge
#[derive(Debug, Clone, Serialize)]
pub struct PurgeResult {
    pub deleted: u64,
    pub cutoff: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_classification_order() {
        assert_eq!(ActionType::classify("Created employee: Jane Doe"), ActionType::Created);
        assert_eq!(ActionType::classify("updated department: IT"), ActionType::Updated);
        assert_eq!(ActionType::classify("Deleted job title: Intern"), ActionType::Deleted);
        assert_eq!(
            ActionType::classify("Deactivated employee: Jane Doe"),
            ActionType::Deactivated
        );
        // 先匹配到 Updated
        assert_eq!(
            ActionType::classify("Updated profile photo: deleted old file"),
            ActionType::Updated
        );
        assert_eq!(ActionType::classify("Login Successful"), ActionType::Other);
    }

    #[test]
    fn test_entity_type_classification() {
        assert_eq!(EntityType::classify("Created Employee: X"), EntityType::Employee);
        assert_eq!(EntityType::classify("Deleted department: Sales"), EntityType::Department);
        assert_eq!(EntityType::classify("Created job title: Accountant"), EntityType::JobTitle);
        assert_eq!(EntityType::classify("Login Failed"), EntityType::System);
    }

    #[test]
    fn test_view_serializes_entity_label() {
        let view = AuditLogView::from(AuditLogEntry {
            id: Uuid::new_v4(),
            action: "Created job title: Accountant".to_string(),
            actor: "admin@company.com".to_string(),
            occurred_at: Utc::now(),
            details: None,
            employee_id: None,
            employee_name: None,
        });
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["entity_type"], "Job Title");
        assert_eq!(json["action_type"], "Created");
        assert_eq!(json["actor"], "admin@company.com");
    }
}
