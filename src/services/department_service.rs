//! 部门服务

use std::sync::Arc;

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    auth::Actor,
    error::AppError,
    models::department::*,
    query::{resolve_sort, Page, PageRequest},
    report::{self, DepartmentReport, ReportFile, ReportFormat},
    repository::{DepartmentRepository, EmployeeRepository},
    services::audit_service::{AuditAction, AuditEntry, AuditService},
};

pub struct DepartmentService {
    db: PgPool,
    audit: Arc<AuditService>,
}

impl DepartmentService {
    pub fn new(db: PgPool, audit: Arc<AuditService>) -> Self {
        Self { db, audit }
    }

    fn repo(&self) -> DepartmentRepository {
        DepartmentRepository::new(self.db.clone())
    }

    pub async fn list(&self, filter: &DepartmentFilter) -> Result<DepartmentListResponse, AppError> {
        let repo = self.repo();
        let sort =
            resolve_sort::<DepartmentSort>(filter.sort_by.as_deref(), filter.sort_order.as_deref());
        let page = PageRequest::new(filter.page, DEPARTMENT_PAGE_SIZE);

        let (items, total) = repo.search(filter, &sort, &page).await?;
        let stats = repo.stats().await?;

        Ok(DepartmentListResponse {
            departments: Page::new(items, page, total),
            stats,
        })
    }

    /// 部门详情，附带所属员工
    pub async fn get(&self, id: Uuid) -> Result<DepartmentDetail, AppError> {
        let department = self
            .repo()
            .find_item(id)
            .await?
            .ok_or_else(|| AppError::not_found("Department"))?;
        let employees = EmployeeRepository::new(self.db.clone())
            .list_by_department(id)
            .await?;
        Ok(DepartmentDetail {
            department,
            employees,
        })
    }

    async fn validate(&self, fields: &DepartmentFields, exclude: Option<Uuid>) -> Result<(), AppError> {
        fields.check().into_result()?;
        if self.repo().name_taken(&fields.name, exclude).await? {
            return Err(AppError::duplicate(
                "name",
                "A department with this name already exists.",
            ));
        }
        Ok(())
    }

    pub async fn create(&self, actor: &Actor, fields: DepartmentFields) -> Result<Department, AppError> {
        let fields = fields.normalized();
        self.validate(&fields, None).await?;

        let mut tx = self.db.begin().await?;
        let department = DepartmentRepository::insert(&mut *tx, &fields).await?;
        AuditService::record(
            &mut *tx,
            AuditEntry::new(AuditAction::DepartmentCreated(&department.name), actor.name()),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(department_id = %department.id, name = %department.name, "Department created");
        Ok(department)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        mut req: UpdateDepartmentRequest,
    ) -> Result<Department, AppError> {
        req.fields = req.fields.normalized();
        self.validate(&req.fields, Some(id)).await?;

        let mut tx = self.db.begin().await?;
        let department = match DepartmentRepository::update(&mut *tx, id, &req).await? {
            Some(department) => department,
            None => return Err(stale_or_missing(&mut *tx, id).await),
        };
        AuditService::record(
            &mut *tx,
            AuditEntry::new(AuditAction::DepartmentUpdated(&department.name), actor.name()),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(department_id = %id, version = department.version, "Department updated");
        Ok(department)
    }

    /// 仍有员工（含已停用）时拒绝删除
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;
        let department = DepartmentRepository::lock(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Department"))?;

        if DepartmentRepository::employee_count(&mut *tx, id).await? > 0 {
            return Err(AppError::ReferentialBlock(format!(
                "Cannot delete department '{}' because it has employees assigned to it.",
                department.name
            )));
        }

        DepartmentRepository::delete(&mut *tx, id).await?;
        AuditService::record(
            &mut *tx,
            AuditEntry::new(AuditAction::DepartmentDeleted(&department.name), actor.name()),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(department_id = %id, name = %department.name, "Department deleted");
        Ok(())
    }

    pub async fn export_pdf(&self, actor: &Actor, filter: &DepartmentFilter) -> Result<ReportFile, AppError> {
        let sort =
            resolve_sort::<DepartmentSort>(filter.sort_by.as_deref(), filter.sort_order.as_deref());
        let departments = self.repo().search_all(filter, &sort).await?;
        let stats = DepartmentStats {
            total_departments: departments.len() as i64,
            total_employees: departments.iter().map(|d| d.employee_count).sum(),
        };

        let file = report::export(
            &DepartmentReport {
                departments: &departments,
                stats: &stats,
            },
            ReportFormat::Pdf,
            "Departments",
            Utc::now(),
        )?;

        self.audit
            .record_now(AuditEntry::new(
                AuditAction::Exported {
                    count: departments.len(),
                    subject: "departments",
                    format: ReportFormat::Pdf,
                },
                actor.name(),
            ))
            .await?;

        Ok(file)
    }
}

async fn stale_or_missing(conn: &mut PgConnection, id: Uuid) -> AppError {
    match DepartmentRepository::exists(conn, id).await {
        Ok(true) => AppError::ConcurrencyConflict,
        Ok(false) => AppError::not_found("Department"),
        Err(e) => e,
    }
}
