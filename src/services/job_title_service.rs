//! 职位服务

use std::sync::Arc;

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    auth::Actor,
    error::AppError,
    models::job_title::*,
    query::{resolve_sort, Page, PageRequest},
    report::{self, JobTitleReport, ReportFile, ReportFormat},
    repository::{JobTitleRepository, EmployeeRepository},
    services::audit_service::{AuditAction, AuditEntry, AuditService},
};

pub struct JobTitleService {
    db: PgPool,
    audit: Arc<AuditService>,
}

impl JobTitleService {
    pub fn new(db: PgPool, audit: Arc<AuditService>) -> Self {
        Self { db, audit }
    }

    fn repo(&self) -> JobTitleRepository {
        JobTitleRepository::new(self.db.clone())
    }

    pub async fn list(&self, filter: &JobTitleFilter) -> Result<JobTitleListResponse, AppError> {
        let repo = self.repo();
        let sort =
            resolve_sort::<JobTitleSort>(filter.sort_by.as_deref(), filter.sort_order.as_deref());
        let page = PageRequest::new(filter.page, JOB_TITLE_PAGE_SIZE);

        let (items, total) = repo.search(filter, &sort, &page).await?;
        let stats = repo.stats().await?;

        Ok(JobTitleListResponse {
            job_titles: Page::new(items, page, total),
            stats,
        })
    }

    /// 职位详情，附带担任该职位的员工
    pub async fn get(&self, id: Uuid) -> Result<JobTitleDetail, AppError> {
        let job_title = self
            .repo()
            .find_item(id)
            .await?
            .ok_or_else(|| AppError::not_found("Job title"))?;
        let employees = EmployeeRepository::new(self.db.clone())
            .list_by_job_title(id)
            .await?;
        Ok(JobTitleDetail {
            job_title,
            employees,
        })
    }

    async fn validate(&self, fields: &JobTitleFields, exclude: Option<Uuid>) -> Result<(), AppError> {
        fields.check().into_result()?;
        if self.repo().title_taken(&fields.title, exclude).await? {
            return Err(AppError::duplicate(
                "title",
                "A job title with this name already exists.",
            ));
        }
        Ok(())
    }

    pub async fn create(&self, actor: &Actor, fields: JobTitleFields) -> Result<JobTitle, AppError> {
        let fields = fields.normalized();
        self.validate(&fields, None).await?;

        let mut tx = self.db.begin().await?;
        let job_title = JobTitleRepository::insert(&mut *tx, &fields).await?;
        AuditService::record(
            &mut *tx,
            AuditEntry::new(AuditAction::JobTitleCreated(&job_title.title), actor.name()),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(job_title_id = %job_title.id, title = %job_title.title, "Job title created");
        Ok(job_title)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        mut req: UpdateJobTitleRequest,
    ) -> Result<JobTitle, AppError> {
        req.fields = req.fields.normalized();
        self.validate(&req.fields, Some(id)).await?;

        let mut tx = self.db.begin().await?;
        let job_title = match JobTitleRepository::update(&mut *tx, id, &req).await? {
            Some(job_title) => job_title,
            None => return Err(stale_or_missing(&mut *tx, id).await),
        };
        AuditService::record(
            &mut *tx,
            AuditEntry::new(AuditAction::JobTitleUpdated(&job_title.title), actor.name()),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(job_title_id = %id, version = job_title.version, "Job title updated");
        Ok(job_title)
    }

    /// 仍有员工（含已停用）时拒绝删除
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;
        let job_title = JobTitleRepository::lock(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Job title"))?;

        if JobTitleRepository::employee_count(&mut *tx, id).await? > 0 {
            return Err(AppError::ReferentialBlock(format!(
                "Cannot delete job title '{}' because it has employees assigned to it.",
                job_title.title
            )));
        }

        JobTitleRepository::delete(&mut *tx, id).await?;
        AuditService::record(
            &mut *tx,
            AuditEntry::new(AuditAction::JobTitleDeleted(&job_title.title), actor.name()),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(job_title_id = %id, title = %job_title.title, "Job title deleted");
        Ok(())
    }

    pub async fn export_pdf(&self, actor: &Actor, filter: &JobTitleFilter) -> Result<ReportFile, AppError> {
        let sort =
            resolve_sort::<JobTitleSort>(filter.sort_by.as_deref(), filter.sort_order.as_deref());
        let job_titles = self.repo().search_all(filter, &sort).await?;
        let stats = JobTitleStats {
            total_job_titles: job_titles.len() as i64,
            total_employees: job_titles.iter().map(|d| d.employee_count).sum(),
        };

        let file = report::export(
            &JobTitleReport {
                job_titles: &job_titles,
                stats: &stats,
            },
            ReportFormat::Pdf,
            "JobTitles",
            Utc::now(),
        )?;

        self.audit
            .record_now(AuditEntry::new(
                AuditAction::Exported {
                    count: job_titles.len(),
                    subject: "job titles",
                    format: ReportFormat::Pdf,
                },
                actor.name(),
            ))
            .await?;

        Ok(file)
    }
}

async fn stale_or_missing(conn: &mut PgConnection, id: Uuid) -> AppError {
    match JobTitleRepository::exists(conn, id).await {
        Ok(true) => AppError::ConcurrencyConflict,
        Ok(false) => AppError::not_found("Job title"),
        Err(e) => e,
    }
}
