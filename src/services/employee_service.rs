//! 员工服务：列表、详情、增改、停用、头像与导出

use std::sync::Arc;

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    auth::Actor,
    error::{AppError, FieldErrors},
    models::{employee::*, options::EmployeeFormOptions},
    query::{resolve_sort, Page, PageRequest},
    report::{self, EmployeeDetailReport, EmployeeListReport, ReportFile, ReportFormat},
    repository::{DepartmentRepository, EmployeeRepository, JobTitleRepository},
    services::{
        audit_service::{AuditAction, AuditEntry, AuditService},
        storage_service::{StorageService, Upload},
    },
};

pub struct EmployeeService {
    db: PgPool,
    audit: Arc<AuditService>,
    storage: Arc<StorageService>,
}

impl EmployeeService {
    pub fn new(db: PgPool, audit: Arc<AuditService>, storage: Arc<StorageService>) -> Self {
        Self { db, audit, storage }
    }

    fn repo(&self) -> EmployeeRepository {
        EmployeeRepository::new(self.db.clone())
    }

    // ==================== Queries ====================

    pub async fn list(&self, filter: &EmployeeFilter) -> Result<EmployeeListResponse, AppError> {
        let repo = self.repo();
        let sort = resolve_sort::<EmployeeSort>(filter.sort_by.as_deref(), filter.sort_order.as_deref());
        let page = PageRequest::new(filter.page, EMPLOYEE_PAGE_SIZE);

        let (items, total) = repo.search(filter, &sort, &page).await?;
        let stats = repo.stats().await?;
        let options = self.form_options().await?;

        Ok(EmployeeListResponse {
            employees: Page::new(items, page, total),
            stats,
            options,
        })
    }

    /// 表单下拉选项：部门与职位按名称排序
    pub async fn form_options(&self) -> Result<EmployeeFormOptions, AppError> {
        Ok(EmployeeFormOptions {
            departments: DepartmentRepository::new(self.db.clone()).options().await?,
            job_titles: JobTitleRepository::new(self.db.clone()).options().await?,
            statuses: vec!["Active", "Inactive"],
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<EmployeeDetail, AppError> {
        let employee = self.find_view(id).await?;
        let years_of_service = years_of_service(employee.hire_date, Utc::now().date_naive());
        Ok(EmployeeDetail {
            employee,
            years_of_service,
        })
    }

    async fn find_view(&self, id: Uuid) -> Result<EmployeeView, AppError> {
        self.repo()
            .find_view(id)
            .await?
            .ok_or_else(|| AppError::not_found("Employee"))
    }

    // ==================== Commands ====================

    /// 字段规则、引用存在性、邮箱唯一性；全部通过才写入
    async fn validate(
        &self,
        conn: &mut PgConnection,
        fields: &EmployeeFields,
        exclude: Option<Uuid>,
    ) -> Result<(), AppError> {
        let mut errors = fields.check();
        if !DepartmentRepository::exists(&mut *conn, fields.department_id).await? {
            errors.add("department_id", "Please select a valid department.");
        }
        if !JobTitleRepository::exists(&mut *conn, fields.job_title_id).await? {
            errors.add("job_title_id", "Please select a valid job title.");
        }
        errors.into_result()?;

        if self.repo().email_taken(&fields.email, exclude).await? {
            return Err(AppError::duplicate(
                "email",
                "An employee with this email already exists.",
            ));
        }
        Ok(())
    }

    pub async fn create(&self, actor: &Actor, req: CreateEmployeeRequest) -> Result<Employee, AppError> {
        let fields = req.normalized();

        let mut tx = self.db.begin().await?;
        self.validate(&mut *tx, &fields, None).await?;

        let employee = EmployeeRepository::insert(&mut *tx, &fields).await?;
        let name = employee.full_name();
        AuditService::record(
            &mut *tx,
            AuditEntry::new(AuditAction::EmployeeCreated(&name), actor.name()).employee(employee.id),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(employee_id = %employee.id, actor = %actor.name(), "Employee created");
        Ok(employee)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        mut req: UpdateEmployeeRequest,
    ) -> Result<Employee, AppError> {
        req.fields = req.fields.normalized();

        let mut tx = self.db.begin().await?;
        if !EmployeeRepository::exists(&mut *tx, id).await? {
            return Err(AppError::not_found("Employee"));
        }
        self.validate(&mut *tx, &req.fields, Some(id)).await?;

        let employee = match EmployeeRepository::update(&mut *tx, id, &req).await? {
            Some(employee) => employee,
            None => return Err(stale_or_missing(&mut *tx, id).await),
        };

        let name = employee.full_name();
        AuditService::record(
            &mut *tx,
            AuditEntry::new(AuditAction::EmployeeUpdated(&name), actor.name()).employee(employee.id),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(employee_id = %id, version = employee.version, "Employee updated");
        Ok(employee)
    }

    /// 软删除：只把 is_active 置为 false
    pub async fn deactivate(&self, actor: &Actor, id: Uuid) -> Result<Employee, AppError> {
        let mut tx = self.db.begin().await?;
        let employee = EmployeeRepository::deactivate(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Employee"))?;

        let name = employee.full_name();
        AuditService::record(
            &mut *tx,
            AuditEntry::new(AuditAction::EmployeeDeactivated(&name), actor.name())
                .employee(employee.id),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(employee_id = %id, actor = %actor.name(), "Employee deactivated");
        Ok(employee)
    }

    /// 保存新头像；提交成功后删除旧文件，失败时删除新文件
    pub async fn update_photo(&self, actor: &Actor, id: Uuid, upload: Upload) -> Result<Employee, AppError> {
        if let Some(message) = upload.check(self.storage.max_upload_bytes()) {
            return Err(AppError::Validation(FieldErrors::single("photo", message)));
        }
        let previous = self
            .repo()
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Employee"))?
            .profile_photo_path;

        let path = self.storage.save_profile_photo(&upload).await?;

        let result = self.store_photo_path(actor, id, &path).await;
        match result {
            Ok(employee) => {
                if let Some(old) = previous.filter(|p| *p != path) {
                    if let Err(e) = self.storage.delete_profile_photo(&old).await {
                        tracing::warn!(path = %old, "Failed to delete previous photo: {}", e);
                    }
                }
                Ok(employee)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete_profile_photo(&path).await {
                    tracing::warn!(path = %path, "Failed to remove orphaned photo: {}", cleanup);
                }
                Err(e)
            }
        }
    }

    async fn store_photo_path(&self, actor: &Actor, id: Uuid, path: &str) -> Result<Employee, AppError> {
        let mut tx = self.db.begin().await?;
        let employee = EmployeeRepository::set_photo(&mut *tx, id, path)
            .await?
            .ok_or_else(|| AppError::not_found("Employee"))?;

        let name = employee.full_name();
        AuditService::record(
            &mut *tx,
            AuditEntry::new(AuditAction::EmployeePhotoUpdated(&name), actor.name())
                .employee(employee.id),
        )
        .await?;
        tx.commit().await?;
        Ok(employee)
    }

    // ==================== Export ====================

    /// 按当前过滤与排序导出全部匹配员工
    pub async fn export_list(
        &self,
        actor: &Actor,
        filter: &EmployeeFilter,
        format: ReportFormat,
    ) -> Result<ReportFile, AppError> {
        let sort = resolve_sort::<EmployeeSort>(filter.sort_by.as_deref(), filter.sort_order.as_deref());
        let employees = self.repo().search_all(filter, &sort).await?;

        let file = report::export(
            &EmployeeListReport {
                employees: &employees,
            },
            format,
            "Employees",
            Utc::now(),
        )?;

        self.audit
            .record_now(AuditEntry::new(
                AuditAction::Exported {
                    count: employees.len(),
                    subject: "employees",
                    format,
                },
                actor.name(),
            ))
            .await?;

        Ok(file)
    }

    pub async fn export_detail(&self, actor: &Actor, id: Uuid) -> Result<ReportFile, AppError> {
        let employee = self.find_view(id).await?;
        let now = Utc::now();
        let detail = EmployeeDetailReport {
            employee: &employee,
        };
        let bytes = report::render(&detail, ReportFormat::Pdf, now)?;

        self.audit
            .record_now(
                AuditEntry::new(
                    AuditAction::EmployeeDetailExported(&employee.full_name),
                    actor.name(),
                )
                .employee(employee.id),
            )
            .await?;

        Ok(ReportFile {
            filename: detail.filename(now),
            content_type: ReportFormat::Pdf.content_type(),
            bytes,
        })
    }
}

/// 版本校验失败后区分：记录已不存在 -> NotFound，否则 -> ConcurrencyConflict
async fn stale_or_missing(conn: &mut PgConnection, id: Uuid) -> AppError {
    match EmployeeRepository::exists(conn, id).await {
        Ok(true) => AppError::ConcurrencyConflict,
        Ok(false) => AppError::not_found("Employee"),
        Err(e) => e,
    }
}
