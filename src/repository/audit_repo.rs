//! Audit repository (审计数据访问)

use crate::{
    error::AppError,
    models::{audit::*, user::{ActivityItem, LoginStats}},
    query::{like_pattern, next_day_start, push_page, start_of_day, Conditions, PageRequest, Sort},
};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const ENTRY_SELECT: &str = r#"
    SELECT a.id, a.action, a.actor, a.occurred_at, a.details, a.employee_id,
           e.first_name || ' ' || e.last_name AS employee_name
    FROM audit_logs a
    LEFT JOIN employees e ON e.id = a.employee_id"#;

const COUNT_SELECT: &str = "SELECT COUNT(*) FROM audit_logs a";

/// 待写入的审计记录
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub action: String,
    pub actor: String,
    pub employee_id: Option<Uuid>,
    pub details: Option<String>,
}

pub struct AuditRepository {
    db: PgPool,
}

pub fn apply_audit_filters(c: &mut Conditions<'_>, f: &AuditLogFilter) {
    if let Some(pattern) = f.search.as_deref().and_then(like_pattern) {
        c.search(&["a.action", "a.details"], pattern);
    }
    if let Some(actor) = f.actor.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        c.and().push("a.actor = ").push_bind(actor.to_string());
    }
    if let Some(pattern) = f.action_type.as_deref().and_then(like_pattern) {
        c.and().push("a.action ILIKE ").push_bind(pattern).push(" ESCAPE '\\'");
    }
    if let Some(pattern) = f.entity_type.as_deref().and_then(like_pattern) {
        c.and().push("a.action ILIKE ").push_bind(pattern).push(" ESCAPE '\\'");
    }
    if let Some(from) = f.date_from {
        c.and().push("a.occurred_at >= ").push_bind(start_of_day(from));
    }
    // 截止日期包含当天全天
    if let Some(to) = f.date_to.and_then(next_day_start) {
        c.and().push("a.occurred_at < ").push_bind(to);
    }
}

impl AuditRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ==================== Audit Logs ====================

    /// 插入审计日志（在调用方事务内）
    pub async fn insert(conn: &mut PgConnection, log: &NewAuditLog) -> Result<AuditLog, AppError> {
        let row = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (action, actor, details, employee_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, action, actor, occurred_at, details, employee_id
            "#,
        )
        .bind(&log.action)
        .bind(&log.actor)
        .bind(&log.details)
        .bind(log.employee_id)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }

    /// 删除早于 cutoff 的记录，返回删除条数
    pub async fn delete_before(conn: &mut PgConnection, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM audit_logs WHERE occurred_at < $1")
            .bind(cutoff)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn search(
        &self,
        filter: &AuditLogFilter,
        sort: &Sort<AuditLogSort>,
        page: &PageRequest,
    ) -> Result<(Vec<AuditLogEntry>, i64), AppError> {
        let mut count = Conditions::new(COUNT_SELECT);
        apply_audit_filters(&mut count, filter);
        let mut count_qb = count.finish();
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.db).await?;

        let mut list = Conditions::new(ENTRY_SELECT);
        apply_audit_filters(&mut list, filter);
        let mut qb = list.finish();
        push_page(&mut qb, sort, page);
        let items = qb
            .build_query_as::<AuditLogEntry>()
            .fetch_all(&self.db)
            .await?;

        Ok((items, total))
    }

    pub async fn search_all(
        &self,
        filter: &AuditLogFilter,
        sort: &Sort<AuditLogSort>,
    ) -> Result<Vec<AuditLogEntry>, AppError> {
        let mut list = Conditions::new(ENTRY_SELECT);
        apply_audit_filters(&mut list, filter);
        let mut qb = list.finish();
        qb.push(sort.order_by());
        let items = qb
            .build_query_as::<AuditLogEntry>()
            .fetch_all(&self.db)
            .await?;
        Ok(items)
    }

    pub async fn find_entry(&self, id: Uuid) -> Result<Option<AuditLogEntry>, AppError> {
        let sql = format!("{} WHERE a.id = $1", ENTRY_SELECT);
        let entry = sqlx::query_as::<_, AuditLogEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(entry)
    }

    /// 无过滤统计：总数、今日、本周
    pub async fn stats(
        &self,
        today_start: DateTime<Utc>,
        week_start: DateTime<Utc>,
    ) -> Result<AuditLogStats, AppError> {
        let stats = sqlx::query_as::<_, AuditLogStats>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE occurred_at >= $1) AS today,
                   COUNT(*) FILTER (WHERE occurred_at >= $2) AS this_week
            FROM audit_logs
            "#,
        )
        .bind(today_start)
        .bind(week_start)
        .fetch_one(&self.db)
        .await?;
        Ok(stats)
    }

    pub async fn distinct_actors(&self) -> Result<Vec<String>, AppError> {
        let actors: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT actor FROM audit_logs ORDER BY actor")
                .fetch_all(&self.db)
                .await?;
        Ok(actors)
    }

    // ==================== Login statistics ====================

    /// 最近一次 "Login Failed Reset" 之后的 "Login Failed" 条数
    pub async fn failed_logins_since_reset(&self, actor: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM audit_logs
            WHERE actor = $1 AND action = $2
              AND occurred_at > COALESCE(
                  (SELECT MAX(occurred_at) FROM audit_logs WHERE actor = $1 AND action = $3),
                  '-infinity'::timestamptz)
            "#,
        )
        .bind(actor)
        .bind(actions::LOGIN_FAILED)
        .bind(actions::LOGIN_FAILED_RESET)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    pub async fn last_successful_login(&self, actor: &str) -> Result<Option<DateTime<Utc>>, AppError> {
        let at: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT MAX(occurred_at) FROM audit_logs WHERE actor = $1 AND action = $2",
        )
        .bind(actor)
        .bind(actions::LOGIN_SUCCESSFUL)
        .fetch_one(&self.db)
        .await?;
        Ok(at)
    }

    pub async fn login_stats(&self, actor: &str) -> Result<LoginStats, AppError> {
        let stats = sqlx::query_as::<_, LoginStats>(
            r#"
            WITH last_reset AS (
                SELECT MAX(occurred_at) AS at FROM audit_logs WHERE actor = $1 AND action = $4
            )
            SELECT
                COUNT(*) FILTER (
                    WHERE action = $3
                      AND occurred_at > COALESCE((SELECT at FROM last_reset), '-infinity'::timestamptz)
                ) AS failed_since_reset,
                COUNT(*) FILTER (WHERE action = $2) AS total_successful,
                MAX(occurred_at) FILTER (WHERE action = $2) AS last_successful,
                MAX(occurred_at) FILTER (WHERE action = $3) AS last_failed
            FROM audit_logs
            WHERE actor = $1
            "#,
        )
        .bind(actor)
        .bind(actions::LOGIN_SUCCESSFUL)
        .bind(actions::LOGIN_FAILED)
        .bind(actions::LOGIN_FAILED_RESET)
        .fetch_one(&self.db)
        .await?;
        Ok(stats)
    }

    /// 登录相关（或非登录相关）的最近记录
    pub async fn recent_activity(
        &self,
        actor: &str,
        login_related: bool,
        limit: i64,
    ) -> Result<Vec<ActivityItem>, AppError> {
        let condition = if login_related {
            "action = ANY($2)"
        } else {
            "NOT (action = ANY($2))"
        };
        let sql = format!(
            "SELECT action, occurred_at, details FROM audit_logs \
             WHERE actor = $1 AND {} ORDER BY occurred_at DESC, id DESC LIMIT $3",
            condition
        );
        let labels: Vec<String> = actions::LOGIN_HISTORY.iter().map(|s| s.to_string()).collect();
        let rows = sqlx::query_as::<_, ActivityItem>(&sql)
            .bind(actor)
            .bind(labels)
            .bind(limit)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_single_day_range_is_half_open() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 1);
        let filter = AuditLogFilter {
            date_from: day,
            date_to: day,
            ..Default::default()
        };
        let mut c = Conditions::new(COUNT_SELECT);
        apply_audit_filters(&mut c, &filter);
        let qb = c.finish();
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM audit_logs a WHERE a.occurred_at >= $1 AND a.occurred_at < $2"
        );
    }

    #[test]
    fn test_blank_actor_ignored() {
        let filter = AuditLogFilter {
            actor: Some("  ".to_string()),
            entity_type: Some("Job Title".to_string()),
            ..Default::default()
        };
        let mut c = Conditions::new(COUNT_SELECT);
        apply_audit_filters(&mut c, &filter);
        let qb = c.finish();
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM audit_logs a WHERE a.action ILIKE $1 ESCAPE '\\'"
        );
    }
}
