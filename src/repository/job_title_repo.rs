//! Job title repository (职位数据访问)

use crate::{
    error::AppError,
    models::{job_title::*, options::OptionItem},
    query::{like_pattern, push_page, Conditions, PageRequest, Sort},
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const LIST_SELECT: &str = r#"
    SELECT j.id, j.title, j.description, j.min_salary, j.max_salary,
           j.created_at, j.updated_at, j.version,
           COUNT(e.id) AS employee_count,
           COUNT(e.id) FILTER (WHERE e.is_active) AS active_employee_count
    FROM job_titles j
    LEFT JOIN employees e ON e.job_title_id = j.id"#;

const GROUP_BY: &str = " GROUP BY j.id";

const COUNT_SELECT: &str = "SELECT COUNT(*) FROM job_titles j";

pub struct JobTitleRepository {
    db: PgPool,
}

pub fn apply_job_title_filters(c: &mut Conditions<'_>, f: &JobTitleFilter) {
    if let Some(pattern) = f.search.as_deref().and_then(like_pattern) {
        c.search(&["j.title", "j.description"], pattern);
    }
}

impl JobTitleRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn search(
        &self,
        filter: &JobTitleFilter,
        sort: &Sort<JobTitleSort>,
        page: &PageRequest,
    ) -> Result<(Vec<JobTitleListItem>, i64), AppError> {
        let mut count = Conditions::new(COUNT_SELECT);
        apply_job_title_filters(&mut count, filter);
        let mut count_qb = count.finish();
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.db).await?;

        let mut list = Conditions::new(LIST_SELECT);
        apply_job_title_filters(&mut list, filter);
        let mut qb = list.finish();
        qb.push(GROUP_BY);
        push_page(&mut qb, sort, page);
        let items = qb
            .build_query_as::<JobTitleListItem>()
            .fetch_all(&self.db)
            .await?;

        Ok((items, total))
    }

    pub async fn search_all(
        &self,
        filter: &JobTitleFilter,
        sort: &Sort<JobTitleSort>,
    ) -> Result<Vec<JobTitleListItem>, AppError> {
        let mut list = Conditions::new(LIST_SELECT);
        apply_job_title_filters(&mut list, filter);
        let mut qb = list.finish();
        qb.push(GROUP_BY);
        qb.push(sort.order_by());
        let items = qb
            .build_query_as::<JobTitleListItem>()
            .fetch_all(&self.db)
            .await?;
        Ok(items)
    }

    pub async fn stats(&self) -> Result<JobTitleStats, AppError> {
        let stats = sqlx::query_as::<_, JobTitleStats>(
            r#"
            SELECT (SELECT COUNT(*) FROM job_titles) AS total_job_titles,
                   (SELECT COUNT(*) FROM employees) AS total_employees
            "#,
        )
        .fetch_one(&self.db)
        .await?;
        Ok(stats)
    }

    pub async fn find_item(&self, id: Uuid) -> Result<Option<JobTitleListItem>, AppError> {
        let sql = format!("{} WHERE j.id = $1{}", LIST_SELECT, GROUP_BY);
        let item = sqlx::query_as::<_, JobTitleListItem>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(item)
    }

    pub async fn options(&self) -> Result<Vec<OptionItem>, AppError> {
        let items = sqlx::query_as::<_, OptionItem>(
            "SELECT id, title AS name FROM job_titles ORDER BY title, id",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    pub async fn title_taken(&self, title: &str, exclude: Option<Uuid>) -> Result<bool, AppError> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM job_titles
                WHERE LOWER(title) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(title)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;
        Ok(taken)
    }

    // ==================== Writes (transactional) ====================

    pub async fn exists(conn: &mut PgConnection, id: Uuid) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM job_titles WHERE id = $1)")
                .bind(id)
                .fetch_one(conn)
                .await?;
        Ok(exists)
    }

    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<JobTitle>, AppError> {
        let job_title =
            sqlx::query_as::<_, JobTitle>("SELECT * FROM job_titles WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(conn)
                .await?;
        Ok(job_title)
    }

    pub async fn employee_count(conn: &mut PgConnection, id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE job_title_id = $1")
            .bind(id)
            .fetch_one(conn)
            .await?;
        Ok(count)
    }

    pub async fn insert(conn: &mut PgConnection, f: &JobTitleFields) -> Result<JobTitle, AppError> {
        let job_title = sqlx::query_as::<_, JobTitle>(
            r#"
            INSERT INTO job_titles (title, description, min_salary, max_salary)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&f.title)
        .bind(&f.description)
        .bind(f.min_salary)
        .bind(f.max_salary)
        .fetch_one(conn)
        .await?;
        Ok(job_title)
    }

    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        req: &UpdateJobTitleRequest,
    ) -> Result<Option<JobTitle>, AppError> {
        let f = &req.fields;
        let job_title = sqlx::query_as::<_, JobTitle>(
            r#"
            UPDATE job_titles
            SET title = $1, description = $2, min_salary = $3, max_salary = $4,
                updated_at = NOW(), version = version + 1
            WHERE id = $5 AND version = $6
            RETURNING *
            "#,
        )
        .bind(&f.title)
        .bind(&f.description)
        .bind(f.min_salary)
        .bind(f.max_salary)
        .bind(id)
        .bind(req.version)
        .fetch_optional(conn)
        .await?;
        Ok(job_title)
    }

    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM job_titles WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_matches_title_or_description() {
        let filter = JobTitleFilter {
            search: Some("dev".to_string()),
            ..Default::default()
        };
        let mut c = Conditions::new(COUNT_SELECT);
        apply_job_title_filters(&mut c, &filter);
        let qb = c.finish();
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM job_titles j WHERE (j.title ILIKE $1 ESCAPE '\\' OR j.description ILIKE $2 ESCAPE '\\')"
        );
    }
}
