//! 审计日志服务
//! 写入（事务内）、查询、导出与保留期清理

use chrono::{Duration, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    auth::Actor,
    error::AppError,
    models::audit::*,
    models::options::AuditLogFilterOptions,
    models::user::{ActivityItem, LoginStats},
    query::{resolve_sort, start_of_day, start_of_week, Page, PageRequest},
    report::{self, AuditLogReport, ReportFile, ReportFormat},
    repository::audit_repo::{AuditRepository, NewAuditLog},
};

/// 审计操作；`label()` 生成写入 `action` 列的文本
#[derive(Debug, Clone)]
pub enum AuditAction<'a> {
    // 员工
    EmployeeCreated(&'a str),
    EmployeeUpdated(&'a str),
    EmployeeDeactivated(&'a str),
    EmployeePhotoUpdated(&'a str),
    EmployeeDetailExported(&'a str),

    // 部门 / 职位
    DepartmentCreated(&'a str),
    DepartmentUpdated(&'a str),
    DepartmentDeleted(&'a str),
    JobTitleCreated(&'a str),
    JobTitleUpdated(&'a str),
    JobTitleDeleted(&'a str),

    /// 列表导出，`subject` 为复数名词，例如 "employees"
    Exported {
        count: usize,
        subject: &'static str,
        format: ReportFormat,
    },

    // 账户
    UserLinked { email: &'a str, employee: &'a str },
    UserUnlinked { email: &'a str, employee: &'a str },
    RoleAssigned { role: &'a str, email: &'a str },
    ProfileUpdated,
    PasswordChanged,

    // 安全
    LoginSuccessful,
    LoginFailed,
    AccountLockedOut,
    LoginFailedReset,
    Purged { count: u64, days: i64 },
}

impl AuditAction<'_> {
    pub fn label(&self) -> String {
        match self {
            AuditAction::EmployeeCreated(n) => format!("Created employee: {}", n),
            AuditAction::EmployeeUpdated(n) => format!("Updated employee: {}", n),
            AuditAction::EmployeeDeactivated(n) => format!("Deactivated employee: {}", n),
            AuditAction::EmployeePhotoUpdated(n) => format!("Updated profile photo: {}", n),
            AuditAction::EmployeeDetailExported(n) => {
                format!("Exported employee details to PDF: {}", n)
            }
            AuditAction::DepartmentCreated(n) => format!("Created department: {}", n),
            AuditAction::DepartmentUpdated(n) => format!("Updated department: {}", n),
            AuditAction::DepartmentDeleted(n) => format!("Deleted department: {}", n),
            AuditAction::JobTitleCreated(n) => format!("Created job title: {}", n),
            AuditAction::JobTitleUpdated(n) => format!("Updated job title: {}", n),
            AuditAction::JobTitleDeleted(n) => format!("Deleted job title: {}", n),
            AuditAction::Exported {
                count,
                subject,
                format,
            } => format!("Exported {} {} to {}", count, subject, format.label()),
            AuditAction::UserLinked { email, employee } => {
                format!("Linked user {} to employee {}", email, employee)
            }
            AuditAction::UserUnlinked { email, employee } => {
                format!("Unlinked user {} from employee {}", email, employee)
            }
            AuditAction::RoleAssigned { role, email } => {
                format!("Assigned role {} to {}", role, email)
            }
            AuditAction::ProfileUpdated => actions::UPDATED_PROFILE.to_string(),
            AuditAction::PasswordChanged => actions::CHANGED_PASSWORD.to_string(),
            AuditAction::LoginSuccessful => actions::LOGIN_SUCCESSFUL.to_string(),
            AuditAction::LoginFailed => actions::LOGIN_FAILED.to_string(),
            AuditAction::AccountLockedOut => actions::ACCOUNT_LOCKED_OUT.to_string(),
            AuditAction::LoginFailedReset => actions::LOGIN_FAILED_RESET.to_string(),
            AuditAction::Purged { count, days } => {
                format!("Purged {} audit log entries older than {} days", count, days)
            }
        }
    }
}

/// 一条待写入的审计记录
#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub action: AuditAction<'a>,
    pub actor: &'a str,
    pub employee_id: Option<Uuid>,
    pub details: Option<String>,
}

impl<'a> AuditEntry<'a> {
    pub fn new(action: AuditAction<'a>, actor: &'a str) -> Self {
        Self {
            action,
            actor,
            employee_id: None,
            details: None,
        }
    }

    pub fn employee(mut self, id: Uuid) -> Self {
        self.employee_id = Some(id);
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn into_record(self) -> NewAuditLog {
        NewAuditLog {
            action: self.action.label(),
            actor: self.actor.to_string(),
            employee_id: self.employee_id,
            details: self.details,
        }
    }
}

pub struct AuditService {
    db: PgPool,
    retention_days: i64,
}

impl AuditService {
    pub fn new(db: PgPool, retention_days: i64) -> Self {
        Self { db, retention_days }
    }

    fn repo(&self) -> AuditRepository {
        AuditRepository::new(self.db.clone())
    }

    /// 在调用方事务内写入；应作为提交前的最后一条语句
    pub async fn record(conn: &mut PgConnection, entry: AuditEntry<'_>) -> Result<AuditLog, AppError> {
        let log = AuditRepository::insert(conn, &entry.into_record()).await?;
        tracing::debug!(action = %log.action, actor = %log.actor, "Audit entry recorded");
        Ok(log)
    }

    /// 独立写入（只读操作之后，例如导出与登录事件）
    pub async fn record_now(&self, entry: AuditEntry<'_>) -> Result<AuditLog, AppError> {
        let mut conn = self.db.acquire().await?;
        Self::record(&mut *conn, entry).await
    }

    // ==================== Queries ====================

    pub async fn list(&self, filter: &AuditLogFilter) -> Result<AuditLogListResponse, AppError> {
        let repo = self.repo();
        let sort = resolve_sort::<AuditLogSort>(filter.sort_by.as_deref(), filter.sort_order.as_deref());
        let page = PageRequest::new(filter.page, AUDIT_PAGE_SIZE);

        let (entries, total) = repo.search(filter, &sort, &page).await?;
        let items = entries.into_iter().map(AuditLogView::from).collect();

        let now = Utc::now();
        let stats = repo
            .stats(start_of_day(now.date_naive()), start_of_week(now))
            .await?;

        let options = AuditLogFilterOptions {
            actors: repo.distinct_actors().await?,
            action_types: ActionType::FILTERABLE.to_vec(),
            entity_types: EntityType::FILTERABLE.to_vec(),
        };

        Ok(AuditLogListResponse {
            logs: Page::new(items, page, total),
            stats,
            options,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<AuditLogView, AppError> {
        self.repo()
            .find_entry(id)
            .await?
            .map(AuditLogView::from)
            .ok_or_else(|| AppError::not_found("Audit log entry"))
    }

    /// 按当前过滤条件与排序导出全部记录
    pub async fn export(
        &self,
        actor: &Actor,
        filter: &AuditLogFilter,
        format: ReportFormat,
    ) -> Result<ReportFile, AppError> {
        let sort = resolve_sort::<AuditLogSort>(filter.sort_by.as_deref(), filter.sort_order.as_deref());
        let logs: Vec<AuditLogView> = self
            .repo()
            .search_all(filter, &sort)
            .await?
            .into_iter()
            .map(AuditLogView::from)
            .collect();

        let file = report::export(&AuditLogReport { logs: &logs }, format, "AuditLog", Utc::now())?;

        self.record_now(AuditEntry::new(
            AuditAction::Exported {
                count: logs.len(),
                subject: "audit log entries",
                format,
            },
            actor.name(),
        ))
        .await?;

        Ok(file)
    }

    /// 删除早于保留期的记录，并在同一事务内记录删除条数
    pub async fn purge(&self, actor: &Actor) -> Result<PurgeResult, AppError> {
        let cutoff = Utc::now() - Duration::days(self.retention_days);

        let mut tx = self.db.begin().await?;
        let deleted = AuditRepository::delete_before(&mut *tx, cutoff).await?;
        Self::record(
            &mut *tx,
            AuditEntry::new(
                AuditAction::Purged {
                    count: deleted,
                    days: self.retention_days,
                },
                actor.name(),
            ),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(deleted, cutoff = %cutoff, actor = %actor.name(), "Audit log purged");
        Ok(PurgeResult { deleted, cutoff })
    }

    // ==================== Login statistics ====================

    pub async fn failed_logins_since_reset(&self, actor: &str) -> Result<i64, AppError> {
        self.repo().failed_logins_since_reset(actor).await
    }

    pub async fn last_successful_login(
        &self,
        actor: &str,
    ) -> Result<Option<chrono::DateTime<Utc>>, AppError> {
        self.repo().last_successful_login(actor).await
    }

    pub async fn login_stats(&self, actor: &str) -> Result<LoginStats, AppError> {
        self.repo().login_stats(actor).await
    }

    pub async fn login_history(&self, actor: &str, limit: i64) -> Result<Vec<ActivityItem>, AppError> {
        self.repo().recent_activity(actor, true, limit).await
    }

    pub async fn other_activity(&self, actor: &str, limit: i64) -> Result<Vec<ActivityItem>, AppError> {
        self.repo().recent_activity(actor, false, limit).await
    }
}
