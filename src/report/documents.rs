//! 各数据集的报表定义

use chrono::{DateTime, Utc};

use super::{format, Column, Report, Section};
use crate::models::audit::{ActionType, AuditLogView};
use crate::models::department::{DepartmentListItem, DepartmentStats};
use crate::models::employee::{EmployeeStats, EmployeeView};
use crate::models::job_title::{salary_range_label, JobTitleListItem, JobTitleStats};

/// Filtered employee list
pub struct EmployeeListReport<'a> {
    pub employees: &'a [EmployeeView],
}

impl EmployeeListReport<'_> {
    fn stats(&self) -> EmployeeStats {
        let active = self.employees.iter().filter(|e| e.is_active).count() as i64;
        let total = self.employees.len() as i64;
        EmployeeStats {
            total,
            active,
            inactive: total - active,
        }
    }
}

impl Report for EmployeeListReport<'_> {
    fn title(&self) -> String {
        "Employee Report".to_string()
    }

    fn info(&self) -> Option<String> {
        Some(format!("Total Employees: {}", self.employees.len()))
    }

    fn summary(&self) -> Vec<(&'static str, String)> {
        let stats = self.stats();
        vec![
            ("Total", stats.total.to_string()),
            ("Active", stats.active.to_string()),
            ("Inactive", stats.inactive.to_string()),
        ]
    }

    fn columns(&self) -> Vec<Column> {
        vec![
            Column::new("Name", 3.0),
            Column::new("Email", 4.0),
            Column::new("Department", 2.5),
            Column::new("Job Title", 3.0),
            Column::new("Salary", 2.0),
            Column::new("Status", 1.5),
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.employees
            .iter()
            .map(|e| {
                vec![
                    e.full_name.clone(),
                    e.email.clone(),
                    e.department_name.clone(),
                    e.job_title.clone(),
                    format::currency(e.salary),
                    e.status_label().to_string(),
                ]
            })
            .collect()
    }

    fn csv_headers(&self) -> Vec<&'static str> {
        vec![
            "First Name",
            "Last Name",
            "Email",
            "Phone",
            "Department",
            "Job Title",
            "Salary",
            "Hire Date",
            "Status",
        ]
    }

    fn csv_rows(&self) -> Vec<Vec<String>> {
        self.employees
            .iter()
            .map(|e| {
                vec![
                    e.first_name.clone(),
                    e.last_name.clone(),
                    e.email.clone(),
                    e.phone.clone().unwrap_or_default(),
                    e.department_name.clone(),
                    e.job_title.clone(),
                    e.salary.round_dp(2).to_string(),
                    e.hire_date.format("%Y-%m-%d").to_string(),
                    e.status_label().to_string(),
                ]
            })
            .collect()
    }
}

/// Single employee detail sheet
pub struct EmployeeDetailReport<'a> {
    pub employee: &'a EmployeeView,
}

impl EmployeeDetailReport<'_> {
    /// `Employee_{Last}_{First}_{yyyyMMdd}.pdf`
    pub fn filename(&self, at: DateTime<Utc>) -> String {
        format!(
            "Employee_{}_{}_{}.pdf",
            sanitize(&self.employee.last_name),
            sanitize(&self.employee.first_name),
            at.format("%Y%m%d")
        )
    }
}

/// 文件名中只保留字母数字、`-` 与 `_`
fn sanitize(part: &str) -> String {
    part.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

impl Report for EmployeeDetailReport<'_> {
    fn title(&self) -> String {
        format!("Employee Details: {}", self.employee.full_name)
    }

    fn sections(&self) -> Vec<Section> {
        let e = self.employee;
        vec![
            Section {
                heading: "Personal Information",
                fields: vec![
                    ("First Name", e.first_name.clone()),
                    ("Last Name", e.last_name.clone()),
                    ("Email", e.email.clone()),
                    ("Phone", e.phone.clone().unwrap_or_else(|| "N/A".to_string())),
                ],
            },
            Section {
                heading: "Employment Information",
                fields: vec![
                    ("Department", e.department_name.clone()),
                    ("Job Title", e.job_title.clone()),
                    ("Salary", format::currency(e.salary)),
                    ("Hire Date", format::long_date(e.hire_date)),
                    ("Status", e.status_label().to_string()),
                ],
            },
            Section {
                heading: "Record Information",
                fields: vec![
                    ("Created Date", format::long_date_time(e.created_at)),
                    (
                        "Last Modified",
                        e.updated_at
                            .map(format::long_date_time)
                            .unwrap_or_else(|| "N/A".to_string()),
                    ),
                ],
            },
        ]
    }
}

pub struct DepartmentReport<'a> {
    pub departments: &'a [DepartmentListItem],
    pub stats: &'a DepartmentStats,
}

impl Report for DepartmentReport<'_> {
    fn title(&self) -> String {
        "Department Report".to_string()
    }

    fn info(&self) -> Option<String> {
        Some(format!("Total Departments: {}", self.departments.len()))
    }

    fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total Departments", self.stats.total_departments.to_string()),
            ("Total Employees", self.stats.total_employees.to_string()),
        ]
    }

    fn columns(&self) -> Vec<Column> {
        vec![
            Column::new("Department Name", 3.0),
            Column::new("Description", 6.0),
            Column::new("Employees", 1.5),
            Column::new("Active", 1.5),
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.departments
            .iter()
            .map(|d| {
                vec![
                    d.name.clone(),
                    d.description
                        .clone()
                        .unwrap_or_else(|| "No description".to_string()),
                    d.employee_count.to_string(),
                    d.active_employee_count.to_string(),
                ]
            })
            .collect()
    }
}

pub struct JobTitleReport<'a> {
    pub job_titles: &'a [JobTitleListItem],
    pub stats: &'a JobTitleStats,
}

impl Report for JobTitleReport<'_> {
    fn title(&self) -> String {
        "Job Title Report".to_string()
    }

    fn info(&self) -> Option<String> {
        Some(format!("Total Job Titles: {}", self.job_titles.len()))
    }

    fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total Job Titles", self.stats.total_job_titles.to_string()),
            ("Total Employees", self.stats.total_employees.to_string()),
        ]
    }

    fn columns(&self) -> Vec<Column> {
        vec![
            Column::new("Job Title", 3.0),
            Column::new("Description", 4.5),
            Column::new("Salary Range", 3.5),
            Column::new("Employees", 1.5),
            Column::new("Active", 1.2),
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.job_titles
            .iter()
            .map(|j| {
                vec![
                    j.title.clone(),
                    j.description
                        .clone()
                        .unwrap_or_else(|| "No description".to_string()),
                    salary_range_label(j.min_salary, j.max_salary),
                    j.employee_count.to_string(),
                    j.active_employee_count.to_string(),
                ]
            })
            .collect()
    }
}

pub struct AuditLogReport<'a> {
    pub logs: &'a [AuditLogView],
}

impl AuditLogReport<'_> {
    fn count(&self, action_type: ActionType) -> usize {
        self.logs
            .iter()
            .filter(|l| l.action_type == action_type)
            .count()
    }
}

impl Report for AuditLogReport<'_> {
    fn title(&self) -> String {
        "Audit Log Report".to_string()
    }

    fn info(&self) -> Option<String> {
        Some(format!("Total Entries: {}", self.logs.len()))
    }

    fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total", self.logs.len().to_string()),
            ("Created", self.count(ActionType::Created).to_string()),
            ("Updated", self.count(ActionType::Updated).to_string()),
            ("Deleted", self.count(ActionType::Deleted).to_string()),
        ]
    }

    fn columns(&self) -> Vec<Column> {
        vec![
            Column::new("Timestamp", 2.2),
            Column::new("User", 3.0),
            Column::new("Action", 5.0),
            Column::new("Type", 1.5),
            Column::new("Entity", 1.5),
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.logs
            .iter()
            .map(|l| {
                vec![
                    format::short_timestamp(l.entry.occurred_at),
                    l.entry.actor.clone(),
                    l.entry.action.clone(),
                    l.action_type.to_string(),
                    l.entity_type.to_string(),
                ]
            })
            .collect()
    }

    fn csv_headers(&self) -> Vec<&'static str> {
        vec![
            "ID",
            "Timestamp",
            "User",
            "Action",
            "Entity Type",
            "Employee",
            "Details",
        ]
    }

    fn csv_rows(&self) -> Vec<Vec<String>> {
        self.logs
            .iter()
            .map(|l| {
                vec![
                    l.entry.id.to_string(),
                    format::iso_timestamp(l.entry.occurred_at),
                    l.entry.actor.clone(),
                    l.entry.action.clone(),
                    l.entity_type.to_string(),
                    l.entry.employee_name.clone().unwrap_or_default(),
                    l.entry.details.clone().unwrap_or_default(),
                ]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn employee(first: &str, last: &str, active: bool) -> EmployeeView {
        EmployeeView {
            id: Uuid::new_v4(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            full_name: format!("{} {}", first, last),
            email: format!("{}@company.com", first.to_lowercase()),
            phone: None,
            department_id: Uuid::new_v4(),
            department_name: "IT".to_string(),
            job_title_id: Uuid::new_v4(),
            job_title: "Senior Developer".to_string(),
            salary: Decimal::new(7_500_000, 2),
            hire_date: NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(),
            is_active: active,
            profile_photo_path: None,
            user_id: None,
            created_at: Utc.with_ymd_and_hms(2023, 1, 15, 9, 30, 0).unwrap(),
            updated_at: None,
            version: 1,
        }
    }

    #[test]
    fn test_employee_summary_counts() {
        let rows = vec![
            employee("John", "Doe", true),
            employee("Jane", "Roe", false),
            employee("Ann", "Lee", true),
        ];
        let report = EmployeeListReport { employees: &rows };
        let summary = report.summary();
        assert_eq!(summary[0], ("Total", "3".to_string()));
        assert_eq!(summary[1], ("Active", "2".to_string()));
        assert_eq!(summary[2], ("Inactive", "1".to_string()));
        assert_eq!(report.rows()[0][4], "$75,000.00");
        assert_eq!(report.csv_rows()[0][6], "75000.00");
    }

    #[test]
    fn test_detail_sections_and_filename() {
        let e = employee("John", "Doe", true);
        let report = EmployeeDetailReport { employee: &e };
        let sections = report.sections();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].fields[3], ("Phone", "N/A".to_string()));
        assert_eq!(sections[1].fields[3], ("Hire Date", "January 15, 2023".to_string()));

        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(report.filename(at), "Employee_Doe_John_20240501.pdf");
    }
}
