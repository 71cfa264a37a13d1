//! Job title domain models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::FieldErrors;
use crate::models::employee::EmployeeView;
use crate::query::{empty_as_none, Page, SortDirection, SortKey};

pub const JOB_TITLE_PAGE_SIZE: i64 = 25;

/// Job title row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct JobTitle {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub min_salary: Option<Decimal>,
    pub max_salary: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct JobTitleListItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub min_salary: Option<Decimal>,
    pub max_salary: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
    pub employee_count: i64,
    pub active_employee_count: i64,
}

#[derive(Debug, Serialize)]
pub struct JobTitleDetail {
    #[serde(flatten)]
    pub job_title: JobTitleListItem,
    pub employees: Vec<EmployeeView>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobTitleFilter {
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
pub enum JobTitleSort {
    Title,
    EmployeeCount,
    MinSalary,
    MaxSalary,
    Created,
}

impl SortKey for JobTitleSort {
    const DEFAULT: Self = JobTitleSort::Title;
    const DEFAULT_DIRECTION: SortDirection = SortDirection::Asc;
    const TIE_BREAKER: &'static str = "j.id";

    fn parse(key: &str) -> Option<Self> {
        match key {
            "title" => Some(JobTitleSort::Title),
            "employeecount" => Some(JobTitleSort::EmployeeCount),
            "minsalary" => Some(JobTitleSort::MinSalary),
            "maxsalary" => Some(JobTitleSort::MaxSalary),
            "created" => Some(JobTitleSort::Created),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            JobTitleSort::Title => "j.title",
            JobTitleSort::EmployeeCount => "COUNT(e.id)",
            JobTitleSort::MinSalary => "j.min_salary",
            JobTitleSort::MaxSalary => "j.max_salary",
            JobTitleSort::Created => "j.created_at",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct JobTitleStats {
    pub total_job_titles: i64,
    pub total_employees: i64,
}

#[derive(Debug, Serialize)]
pub struct JobTitleListResponse {
    pub job_titles: Page<JobTitleListItem>,
    pub stats: JobTitleStats,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct JobTitleFields {
    #[validate(length(min = 1, max = 100, message = "Job title must be between 1 and 100 characters"))]
    pub title: String,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub min_salary: Option<Decimal>,
    #[serde(default)]
    pub max_salary: Option<Decimal>,
}

impl JobTitleFields {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self
    }

    pub fn check(&self) -> FieldErrors {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };

        for (field, value) in [("min_salary", self.min_salary), ("max_salary", self.max_salary)] {
            if matches!(value, Some(v) if v < Decimal::ZERO) {
                errors.add(field, "Salary cannot be negative");
            }
        }

        if let (Some(min), Some(max)) = (self.min_salary, self.max_salary) {
            if min > max {
                errors.add(
                    "max_salary",
                    "Maximum salary must be greater than minimum salary.",
                );
            }
        }

        errors
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateJobTitleRequest {
    #[serde(flatten)]
    pub fields: JobTitleFields,
    pub version: i32,
}

/// "$a - $b" / "From $a" / "Up to $b" / "Not specified"
pub fn salary_range_label(min: Option<Decimal>, max: Option<Decimal>) -> String {
    use crate::report::format::currency;
    match (min, max) {
        (Some(a), Some(b)) => format!("{} - {}", currency(a), currency(b)),
        (Some(a), None) => format!("From {}", currency(a)),
        (None, Some(b)) => format!("Up to {}", currency(b)),
        (None, None) => "Not specified".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(min: Option<i64>, max: Option<i64>) -> JobTitleFields {
        JobTitleFields {
            title: "Accountant".to_string(),
            description: None,
            min_salary: min.map(|v| Decimal::new(v, 0)),
            max_salary: max.map(|v| Decimal::new(v, 0)),
        }
    }

    #[test]
    fn test_min_greater_than_max_flags_max_salary() {
        let errors = fields(Some(90_000), Some(50_000)).check();
        assert_eq!(
            errors.get("max_salary"),
            Some(&["Maximum salary must be greater than minimum salary.".to_string()][..])
        );
    }

    #[test]
    fn test_open_ranges_are_valid() {
        assert!(fields(Some(50_000), None).check().is_empty());
        assert!(fields(None, Some(50_000)).check().is_empty());
        assert!(fields(Some(50_000), Some(50_000)).check().is_empty());
    }

    #[test]
    fn test_salary_range_label() {
        let a = Some(Decimal::new(50_000, 0));
        let b = Some(Decimal::new(75_000, 0));
        assert_eq!(salary_range_label(a, b), "$50,000.00 - $75,000.00");
        assert_eq!(salary_range_label(a, None), "From $50,000.00");
        assert_eq!(salary_range_label(None, b), "Up to $75,000.00");
        assert_eq!(salary_range_label(None, None), "Not specified");
    }
}
