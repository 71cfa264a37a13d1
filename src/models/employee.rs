//! Employee domain models

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::FieldErrors;
use crate::models::options::EmployeeFormOptions;
use crate::query::{empty_as_none, Page, SortDirection, SortKey};

/// 员工列表每页条数
pub const EMPLOYEE_PAGE_SIZE: i64 = 10;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9()\-.\s]{3,20}$").expect("valid phone regex"));

/// Employee row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Employee {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department_id: Uuid,
    pub job_title_id: Uuid,
    pub salary: Decimal,
    pub hire_date: NaiveDate,
    pub is_active: bool,
    pub profile_photo_path: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Employee joined with department and job title names
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EmployeeView {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department_id: Uuid,
    pub department_name: String,
    pub job_title_id: Uuid,
    pub job_title: String,
    pub salary: Decimal,
    pub hire_date: NaiveDate,
    pub is_active: bool,
    pub profile_photo_path: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

impl EmployeeView {
    pub fn status_label(&self) -> &'static str {
        if self.is_active {
            "Active"
        } else {
            "Inactive"
        }
    }
}

/// 整年工龄；当年周年日未到则减一
pub fn years_of_service(hire_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut years = today.year() - hire_date.year();
    if (today.month(), today.day()) < (hire_date.month(), hire_date.day()) {
        years -= 1;
    }
    years.max(0)
}

/// Employee detail response
#[derive(Debug, Serialize)]
pub struct EmployeeDetail {
    #[serde(flatten)]
    pub employee: EmployeeView,
    pub years_of_service: i32,
}

/// 员工状态过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Active,
    Inactive,
}

impl StatusFilter {
    /// 只识别 active / inactive，其余取值忽略
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("active") => Some(StatusFilter::Active),
            Some("inactive") => Some(StatusFilter::Inactive),
            _ => None,
        }
    }
}

/// Employee list query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub department_id: Option<Uuid>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub job_title_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub salary_min: Option<Decimal>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub salary_max: Option<Decimal>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub hire_date_from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub hire_date_to: Option<NaiveDate>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page: Option<i64>,
}

/// Employee list sort keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmployeeSort {
    FirstName,
    LastName,
    Email,
    Department,
    JobTitle,
    Salary,
    HireDate,
    Status,
}

impl SortKey for EmployeeSort {
    const DEFAULT: Self = EmployeeSort::LastName;
    const DEFAULT_DIRECTION: SortDirection = SortDirection::Asc;
    const TIE_BREAKER: &'static str = "e.id";

    fn parse(key: &str) -> Option<Self> {
        Some(match key {
            "firstname" => EmployeeSort::FirstName,
            "lastname" => EmployeeSort::LastName,
            "email" => EmployeeSort::Email,
            "department" => EmployeeSort::Department,
            "jobtitle" => EmployeeSort::JobTitle,
            "salary" => EmployeeSort::Salary,
            "hiredate" => EmployeeSort::HireDate,
            "status" => EmployeeSort::Status,
            _ => return None,
        })
    }

    fn column(&self) -> &'static str {
        match self {
            EmployeeSort::FirstName => "e.first_name",
            EmployeeSort::LastName => "e.last_name",
            EmployeeSort::Email => "e.email",
            EmployeeSort::Department => "d.name",
            EmployeeSort::JobTitle => "j.title",
            EmployeeSort::Salary => "e.salary",
            EmployeeSort::HireDate => "e.hire_date",
            EmployeeSort::Status => "e.is_active",
        }
    }
}

/// Unfiltered employee counts
#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct EmployeeStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
}

/// Employee list response
#[derive(Debug, Serialize)]
pub struct EmployeeListResponse {
    pub employees: Page<EmployeeView>,
    pub stats: EmployeeStats,
    pub options: EmployeeFormOptions,
}

/// Editable employee fields (create and update)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EmployeeFields {
    #[validate(length(min = 2, max = 50, message = "First name must be between 2 and 50 characters"))]
    pub first_name: String,
    #[validate(length(min = 2, max = 50, message = "Last name must be between 2 and 50 characters"))]
    pub last_name: String,
    #[validate(
        email(message = "Invalid email address"),
        length(max = 100, message = "Email cannot exceed 100 characters")
    )]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub department_id: Uuid,
    pub job_title_id: Uuid,
    pub salary: Decimal,
    pub hire_date: NaiveDate,
}

impl EmployeeFields {
    /// 派生校验之外的规则：电话字符集、薪资区间
    pub fn check(&self) -> FieldErrors {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };

        if let Some(phone) = self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            if !PHONE_RE.is_match(phone) {
                errors.add("phone", "Invalid phone number");
            }
        }

        let min = Decimal::new(1, 2);
        let max = Decimal::new(999_999_999, 2);
        if self.salary < min || self.salary > max {
            errors.add("salary", "Salary must be between 0.01 and 9,999,999.99");
        }

        errors
    }

    /// 去除首尾空白，空电话视为未提供
    pub fn normalized(mut self) -> Self {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.email = self.email.trim().to_string();
        self.phone = self
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self
    }
}

/// Create employee request
pub type CreateEmployeeRequest = EmployeeFields;

/// Update employee request
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEmployeeRequest {
    #[serde(flatten)]
    pub fields: EmployeeFields,
    pub is_active: bool,
    /// 客户端读取时的版本号
    pub version: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> EmployeeFields {
        EmployeeFields {
            first_name: "Jane".to_string(),
            last_name: "Smith".to_string(),
            email: "jane.smith@company.com".to_string(),
            phone: Some("+1 (555) 010-2000".to_string()),
            department_id: Uuid::new_v4(),
            job_title_id: Uuid::new_v4(),
            salary: Decimal::new(7_500_000, 2),
            hire_date: NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(),
        }
    }

    #[test]
    fn test_valid_fields() {
        assert!(fields().check().is_empty());
    }

    #[test]
    fn test_invalid_fields_are_collected() {
        let mut f = fields();
        f.first_name = "J".to_string();
        f.email = "not-an-email".to_string();
        f.phone = Some("call me".to_string());
        f.salary = Decimal::ZERO;

        let errors = f.check();
        assert!(errors.contains("first_name"));
        assert!(errors.contains("email"));
        assert!(errors.contains("phone"));
        assert!(errors.contains("salary"));
        assert!(!errors.contains("last_name"));
    }

    #[test]
    fn test_salary_upper_bound() {
        let mut f = fields();
        f.salary = Decimal::new(999_999_999, 2);
        assert!(f.check().is_empty());
        f.salary = Decimal::new(1_000_000_000, 2);
        assert!(f.check().contains("salary"));
    }

    #[test]
    fn test_years_of_service() {
        let hired = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap();
        let before = NaiveDate::from_ymd_opt(2025, 1, 14).unwrap();
        let on = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(years_of_service(hired, before), 1);
        assert_eq!(years_of_service(hired, on), 2);
        assert_eq!(years_of_service(hired, hired), 0);
    }

    #[test]
    fn test_status_filter() {
        assert_eq!(StatusFilter::parse(Some("Active")), Some(StatusFilter::Active));
        assert_eq!(StatusFilter::parse(Some("inactive")), Some(StatusFilter::Inactive));
        assert_eq!(StatusFilter::parse(Some("all")), None);
        assert_eq!(StatusFilter::parse(None), None);
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!(EmployeeSort::parse("hiredate"), Some(EmployeeSort::HireDate));
        assert_eq!(EmployeeSort::parse("hire_date"), None);
    }
}
