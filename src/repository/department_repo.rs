//! Department repository (部门数据访问)

use crate::{
    error::AppError,
    models::{department::*, options::OptionItem},
    query::{like_pattern, push_page, Conditions, PageRequest, Sort},
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const LIST_SELECT: &str = r#"
    SELECT d.id, d.name, d.description, d.created_at, d.updated_at, d.version,
           COUNT(e.id) AS employee_count,
           COUNT(e.id) FILTER (WHERE e.is_active) AS active_employee_count
    FROM departments d
    LEFT JOIN employees e ON e.department_id = d.id"#;

const GROUP_BY: &str = " GROUP BY d.id";

const COUNT_SELECT: &str = "SELECT COUNT(*) FROM departments d";

pub struct DepartmentRepository {
    db: PgPool,
}

pub fn apply_department_filters(c: &mut Conditions<'_>, f: &DepartmentFilter) {
    if let Some(pattern) = f.search.as_deref().and_then(like_pattern) {
        c.search(&["d.name", "d.description"], pattern);
    }
}

impl DepartmentRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn search(
        &self,
        filter: &DepartmentFilter,
        sort: &Sort<DepartmentSort>,
        page: &PageRequest,
    ) -> Result<(Vec<DepartmentListItem>, i64), AppError> {
        let mut count = Conditions::new(COUNT_SELECT);
        apply_department_filters(&mut count, filter);
        let mut count_qb = count.finish();
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.db).await?;

        let mut list = Conditions::new(LIST_SELECT);
        apply_department_filters(&mut list, filter);
        let mut qb = list.finish();
        qb.push(GROUP_BY);
        push_page(&mut qb, sort, page);
        let items = qb
            .build_query_as::<DepartmentListItem>()
            .fetch_all(&self.db)
            .await?;

        Ok((items, total))
    }

    pub async fn search_all(
        &self,
        filter: &DepartmentFilter,
        sort: &Sort<DepartmentSort>,
    ) -> Result<Vec<DepartmentListItem>, AppError> {
        let mut list = Conditions::new(LIST_SELECT);
        apply_department_filters(&mut list, filter);
        let mut qb = list.finish();
        qb.push(GROUP_BY);
        qb.push(sort.order_by());
        let items = qb
            .build_query_as::<DepartmentListItem>()
            .fetch_all(&self.db)
            .await?;
        Ok(items)
    }

    pub async fn stats(&self) -> Result<DepartmentStats, AppError> {
        let stats = sqlx::query_as::<_, DepartmentStats>(
            r#"
            SELECT (SELECT COUNT(*) FROM departments) AS total_departments,
                   (SELECT COUNT(*) FROM employees) AS total_employees
            "#,
        )
        .fetch_one(&self.db)
        .await?;
        Ok(stats)
    }

    pub async fn find_item(&self, id: Uuid) -> Result<Option<DepartmentListItem>, AppError> {
        let sql = format!("{} WHERE d.id = $1{}", LIST_SELECT, GROUP_BY);
        let item = sqlx::query_as::<_, DepartmentListItem>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(item)
    }

    /// 下拉选项，按名称排序
    pub async fn options(&self) -> Result<Vec<OptionItem>, AppError> {
        let items = sqlx::query_as::<_, OptionItem>(
            "SELECT id, name FROM departments ORDER BY name, id",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    pub async fn name_taken(&self, name: &str, exclude: Option<Uuid>) -> Result<bool, AppError> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM departments
                WHERE LOWER(name) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;
        Ok(taken)
    }

    // ==================== Writes (transactional) ====================

    pub async fn exists(conn: &mut PgConnection, id: Uuid) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM departments WHERE id = $1)")
                .bind(id)
                .fetch_one(conn)
                .await?;
        Ok(exists)
    }

    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<Department>, AppError> {
        let department =
            sqlx::query_as::<_, Department>("SELECT * FROM departments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(conn)
                .await?;
        Ok(department)
    }

    pub async fn employee_count(conn: &mut PgConnection, id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE department_id = $1")
            .bind(id)
            .fetch_one(conn)
            .await?;
        Ok(count)
    }

    pub async fn insert(conn: &mut PgConnection, f: &DepartmentFields) -> Result<Department, AppError> {
        let department = sqlx::query_as::<_, Department>(
            "INSERT INTO departments (name, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(&f.name)
        .bind(&f.description)
        .fetch_one(conn)
        .await?;
        Ok(department)
    }

    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        req: &UpdateDepartmentRequest,
    ) -> Result<Option<Department>, AppError> {
        let department = sqlx::query_as::<_, Department>(
            r#"
            UPDATE departments
            SET name = $1, description = $2, updated_at = NOW(), version = version + 1
            WHERE id = $3 AND version = $4
            RETURNING *
            "#,
        )
        .bind(&req.fields.name)
        .bind(&req.fields.description)
        .bind(id)
        .bind(req.version)
        .fetch_optional(conn)
        .await?;
        Ok(department)
    }

    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::resolve_sort;

    #[test]
    fn test_list_sql_groups_before_ordering() {
        let filter = DepartmentFilter {
            search: Some("sales".to_string()),
            ..Default::default()
        };
        let sort = resolve_sort::<DepartmentSort>(Some("employeecount"), Some("desc"));
        let mut list = Conditions::new(LIST_SELECT);
        apply_department_filters(&mut list, &filter);
        let mut qb = list.finish();
        qb.push(GROUP_BY);
        push_page(&mut qb, &sort, &PageRequest::new(Some(2), DEPARTMENT_PAGE_SIZE));

        let sql = qb.sql();
        let where_at = sql.find(" WHERE ").unwrap();
        let group_at = sql.find(" GROUP BY ").unwrap();
        let order_at = sql.find(" ORDER BY COUNT(e.id) DESC, d.id ASC").unwrap();
        assert!(where_at < group_at && group_at < order_at);
        assert!(sql.ends_with("LIMIT $3 OFFSET $4"));
    }
}
