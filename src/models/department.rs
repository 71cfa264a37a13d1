//! Department domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::FieldErrors;
use crate::models::employee::EmployeeView;
use crate::query::{empty_as_none, Page, SortDirection, SortKey};

pub const DEPARTMENT_PAGE_SIZE: i64 = 25;

/// Department row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

/// Department with assigned-employee counts
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DepartmentListItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
    pub employee_count: i64,
    pub active_employee_count: i64,
}

/// Department detail with its employees
#[derive(Debug, Serialize)]
pub struct DepartmentDetail {
    #[serde(flatten)]
    pub department: DepartmentListItem,
    pub employees: Vec<EmployeeView>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartmentSort {
    Name,
    EmployeeCount,
    Created,
}

impl SortKey for DepartmentSort {
    const DEFAULT: Self = DepartmentSort::Name;
    const DEFAULT_DIRECTION: SortDirection = SortDirection::Asc;
    const TIE_BREAKER: &'static str = "d.id";

    fn parse(key: &str) -> Option<Self> {
        match key {
            "name" => Some(DepartmentSort::Name),
            "employeecount" => Some(DepartmentSort::EmployeeCount),
            "created" => Some(DepartmentSort::Created),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            DepartmentSort::Name => "d.name",
            DepartmentSort::EmployeeCount => "COUNT(e.id)",
            DepartmentSort::Created => "d.created_at",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct DepartmentStats {
    pub total_departments: i64,
    pub total_employees: i64,
}

#[derive(Debug, Serialize)]
pub struct DepartmentListResponse {
    pub departments: Page<DepartmentListItem>,
    pub stats: DepartmentStats,
}

/// Create department request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DepartmentFields {
    #[validate(length(min = 1, max = 100, message = "Department name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    #[serde(default)]
    pub description: Option<String>,
}

impl DepartmentFields {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self
    }

    pub fn check(&self) -> FieldErrors {
        match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDepartmentRequest {
    #[serde(flatten)]
    pub fields: DepartmentFields,
    pub version: i32,
}
