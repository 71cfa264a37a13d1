//! Dropdown option lists returned alongside forms and list views

use serde::Serialize;
use uuid::Uuid;

/// One selectable entry
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OptionItem {
    pub id: Uuid,
    pub name: String,
}

/// Options for the employee form and employee list filters
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmployeeFormOptions {
    pub departments: Vec<OptionItem>,
    pub job_titles: Vec<OptionItem>,
    pub statuses: Vec<&'static str>,
}

/// Options for the audit log filters
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditLogFilterOptions {
    /// 出现过的操作者（去重、排序）
    pub actors: Vec<String>,
    pub action_types: Vec<&'static str>,
    pub entity_types: Vec<&'static str>,
}
