//! Employee repository (员工数据访问)
//!
//! 读操作走连接池；写操作接收 `&mut PgConnection`，由服务层在同一事务中
//! 与审计记录一起提交。

use crate::{
    error::AppError,
    models::employee::*,
    query::{like_pattern, push_page, Conditions, PageRequest, Sort},
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const VIEW_SELECT: &str = r#"
    SELECT e.id, e.first_name, e.last_name,
           e.first_name || ' ' || e.last_name AS full_name,
           e.email, e.phone,
           e.department_id, d.name AS department_name,
           e.job_title_id, j.title AS job_title,
           e.salary, e.hire_date, e.is_active, e.profile_photo_path, e.user_id,
           e.created_at, e.updated_at, e.version
    FROM employees e
    JOIN departments d ON d.id = e.department_id
    JOIN job_titles j ON j.id = e.job_title_id"#;

const COUNT_SELECT: &str = "SELECT COUNT(*) FROM employees e";

pub struct EmployeeRepository {
    db: PgPool,
}

/// 把过滤条件追加到查询上（计数与分页共用）
pub fn apply_employee_filters(c: &mut Conditions<'_>, f: &EmployeeFilter) {
    if let Some(pattern) = f.search.as_deref().and_then(like_pattern) {
        c.search(&["e.first_name", "e.last_name", "e.email"], pattern);
    }
    if let Some(id) = f.department_id {
        c.and().push("e.department_id = ").push_bind(id);
    }
    if let Some(id) = f.job_title_id {
        c.and().push("e.job_title_id = ").push_bind(id);
    }
    match StatusFilter::parse(f.status.as_deref()) {
        Some(StatusFilter::Active) => {
            c.and().push("e.is_active = TRUE");
        }
        Some(StatusFilter::Inactive) => {
            c.and().push("e.is_active = FALSE");
        }
        None => {}
    }
    if let Some(min) = f.salary_min {
        c.and().push("e.salary >= ").push_bind(min);
    }
    if let Some(max) = f.salary_max {
        c.and().push("e.salary <= ").push_bind(max);
    }
    if let Some(from) = f.hire_date_from {
        c.and().push("e.hire_date >= ").push_bind(from);
    }
    if let Some(to) = f.hire_date_to {
        c.and().push("e.hire_date <= ").push_bind(to);
    }
}

impl EmployeeRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ==================== Queries ====================

    /// 过滤后的一页数据及过滤后总数
    pub async fn search(
        &self,
        filter: &EmployeeFilter,
        sort: &Sort<EmployeeSort>,
        page: &PageRequest,
    ) -> Result<(Vec<EmployeeView>, i64), AppError> {
        let mut count = Conditions::new(COUNT_SELECT);
        apply_employee_filters(&mut count, filter);
        let mut count_qb = count.finish();
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.db).await?;

        let mut list = Conditions::new(VIEW_SELECT);
        apply_employee_filters(&mut list, filter);
        let mut qb = list.finish();
        push_page(&mut qb, sort, page);
        let items = qb
            .build_query_as::<EmployeeView>()
            .fetch_all(&self.db)
            .await?;

        Ok((items, total))
    }

    /// 导出使用：全部匹配记录，不分页
    pub async fn search_all(
        &self,
        filter: &EmployeeFilter,
        sort: &Sort<EmployeeSort>,
    ) -> Result<Vec<EmployeeView>, AppError> {
        let mut list = Conditions::new(VIEW_SELECT);
        apply_employee_filters(&mut list, filter);
        let mut qb = list.finish();
        qb.push(sort.order_by());
        let items = qb
            .build_query_as::<EmployeeView>()
            .fetch_all(&self.db)
            .await?;
        Ok(items)
    }

    /// 无过滤统计
    pub async fn stats(&self) -> Result<EmployeeStats, AppError> {
        let stats = sqlx::query_as::<_, EmployeeStats>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE is_active) AS active,
                   COUNT(*) FILTER (WHERE NOT is_active) AS inactive
            FROM employees
            "#,
        )
        .fetch_one(&self.db)
        .await?;
        Ok(stats)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Employee>, AppError> {
        let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(employee)
    }

    pub async fn find_view(&self, id: Uuid) -> Result<Option<EmployeeView>, AppError> {
        let sql = format!("{} WHERE e.id = $1", VIEW_SELECT);
        let employee = sqlx::query_as::<_, EmployeeView>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(employee)
    }

    pub async fn list_by_department(&self, department_id: Uuid) -> Result<Vec<EmployeeView>, AppError> {
        let sql = format!(
            "{} WHERE e.department_id = $1 ORDER BY e.last_name, e.first_name, e.id",
            VIEW_SELECT
        );
        let rows = sqlx::query_as::<_, EmployeeView>(&sql)
            .bind(department_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    pub async fn list_by_job_title(&self, job_title_id: Uuid) -> Result<Vec<EmployeeView>, AppError> {
        let sql = format!(
            "{} WHERE e.job_title_id = $1 ORDER BY e.last_name, e.first_name, e.id",
            VIEW_SELECT
        );
        let rows = sqlx::query_as::<_, EmployeeView>(&sql)
            .bind(job_title_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    /// 邮箱是否已被其他员工使用（不区分大小写）
    pub async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, AppError> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM employees
                WHERE LOWER(email) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;
        Ok(taken)
    }

    // ==================== Account linking ====================

    pub async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<EmployeeView>, AppError> {
        let sql = format!("{} WHERE e.user_id = $1", VIEW_SELECT);
        let employee = sqlx::query_as::<_, EmployeeView>(&sql)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(employee)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<EmployeeView>, AppError> {
        let sql = format!("{} WHERE LOWER(e.email) = LOWER($1)", VIEW_SELECT);
        let employee = sqlx::query_as::<_, EmployeeView>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(employee)
    }

    /// 未关联账户或已关联到该账户的员工
    pub async fn linkable_for(&self, user_id: Uuid) -> Result<Vec<EmployeeView>, AppError> {
        let sql = format!(
            "{} WHERE e.user_id IS NULL OR e.user_id = $1 ORDER BY e.last_name, e.id",
            VIEW_SELECT
        );
        let rows = sqlx::query_as::<_, EmployeeView>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    // ==================== Writes (transactional) ====================

    pub async fn exists(conn: &mut PgConnection, id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM employees WHERE id = $1)")
            .bind(id)
            .fetch_one(conn)
            .await?;
        Ok(exists)
    }

    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<Employee>, AppError> {
        let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(employee)
    }

    pub async fn insert(conn: &mut PgConnection, f: &EmployeeFields) -> Result<Employee, AppError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            INSERT INTO employees (
                first_name, last_name, email, phone, department_id, job_title_id,
                salary, hire_date, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE)
            RETURNING *
            "#,
        )
        .bind(&f.first_name)
        .bind(&f.last_name)
        .bind(&f.email)
        .bind(&f.phone)
        .bind(f.department_id)
        .bind(f.job_title_id)
        .bind(f.salary)
        .bind(f.hire_date)
        .fetch_one(conn)
        .await?;
        Ok(employee)
    }

    /// 带版本校验的更新；版本不匹配或记录不存在时返回 None
    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        req: &UpdateEmployeeRequest,
    ) -> Result<Option<Employee>, AppError> {
        let f = &req.fields;
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            UPDATE employees
            SET first_name = $1, last_name = $2, email = $3, phone = $4,
                department_id = $5, job_title_id = $6, salary = $7, hire_date = $8,
                is_active = $9, updated_at = NOW(), version = version + 1
            WHERE id = $10 AND version = $11
            RETURNING *
            "#,
        )
        .bind(&f.first_name)
        .bind(&f.last_name)
        .bind(&f.email)
        .bind(&f.phone)
        .bind(f.department_id)
        .bind(f.job_title_id)
        .bind(f.salary)
        .bind(f.hire_date)
        .bind(req.is_active)
        .bind(id)
        .bind(req.version)
        .fetch_optional(conn)
        .await?;
        Ok(employee)
    }

    /// 软删除
    pub async fn deactivate(conn: &mut PgConnection, id: Uuid) -> Result<Option<Employee>, AppError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            UPDATE employees
            SET is_active = FALSE, updated_at = NOW(), version = version + 1
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(employee)
    }

    pub async fn set_photo(
        conn: &mut PgConnection,
        id: Uuid,
        path: &str,
    ) -> Result<Option<Employee>, AppError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            UPDATE employees
            SET profile_photo_path = $1, updated_at = NOW(), version = version + 1
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(path)
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(employee)
    }

    /// 解除该账户与所有员工的关联，返回受影响行数
    pub async fn clear_user_link(conn: &mut PgConnection, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE employees SET user_id = NULL, updated_at = NOW(), version = version + 1 WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_user_link(
        conn: &mut PgConnection,
        employee_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Employee>, AppError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            UPDATE employees
            SET user_id = $1, updated_at = NOW(), version = version + 1
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(employee_id)
        .fetch_optional(conn)
        .await?;
        Ok(employee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn test_no_filters_no_where() {
        let mut c = Conditions::new(COUNT_SELECT);
        apply_employee_filters(&mut c, &EmployeeFilter::default());
        assert_eq!(c.finish().sql(), COUNT_SELECT);
    }

    #[test]
    fn test_unknown_status_ignored() {
        let filter = EmployeeFilter {
            status: Some("all".to_string()),
            ..Default::default()
        };
        let mut c = Conditions::new(COUNT_SELECT);
        apply_employee_filters(&mut c, &filter);
        assert!(!c.finish().sql().contains("WHERE"));
    }

    #[test]
    fn test_all_filters_are_conjunctive() {
        let filter = EmployeeFilter {
            search: Some("ann".to_string()),
            department_id: Some(Uuid::new_v4()),
            job_title_id: Some(Uuid::new_v4()),
            status: Some("active".to_string()),
            salary_min: Some(Decimal::new(1000, 0)),
            salary_max: Some(Decimal::new(2000, 0)),
            hire_date_from: NaiveDate::from_ymd_opt(2020, 1, 1),
            hire_date_to: NaiveDate::from_ymd_opt(2021, 1, 1),
            ..Default::default()
        };
        let mut c = Conditions::new(COUNT_SELECT);
        apply_employee_filters(&mut c, &filter);
        let qb = c.finish();
        let sql = qb.sql();
        assert_eq!(sql.matches(" WHERE ").count(), 1);
        assert_eq!(sql.matches(" AND ").count(), 7);
        assert!(sql.contains("e.salary >= "));
        assert!(sql.contains("e.hire_date <= "));
    }
}
