//! User repository (登录账户与角色的数据库访问层)

use crate::{
    auth::Role,
    error::AppError,
    models::user::*,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

pub struct UserRepository {
    db: PgPool,
}

fn parse_roles(names: Vec<String>) -> Vec<Role> {
    let mut roles: Vec<Role> = names.iter().filter_map(|n| n.parse().ok()).collect();
    roles.sort_by_key(|r| Role::ALL.iter().position(|x| x == r));
    roles
}

impl UserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 根据 ID 查找用户
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    /// 根据邮箱查找用户（不区分大小写）
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    /// 所有用户，按邮箱排序
    pub async fn list_all(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY email, id")
            .fetch_all(&self.db)
            .await?;
        Ok(users)
    }

    /// 创建用户
    pub async fn insert(&self, new: &NewUser) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, username, password_hash, phone, email_confirmed)
            VALUES ($1, $1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.phone)
        .bind(new.email_confirmed)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    pub async fn email_taken_by_other(&self, email: &str, id: Uuid) -> Result<bool, AppError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND id <> $2)",
        )
        .bind(email)
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(taken)
    }

    pub async fn update_profile(
        &self,
        id: Uuid,
        email: &str,
        phone: Option<&str>,
        email_confirmed: bool,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = $1, username = $1, phone = $2, email_confirmed = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(phone)
        .bind(email_confirmed)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    // ==================== Roles ====================

    pub async fn roles_of(&self, id: Uuid) -> Result<Vec<Role>, AppError> {
        let names: Vec<String> = sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = $1")
            .bind(id)
            .fetch_all(&self.db)
            .await?;
        Ok(parse_roles(names))
    }

    /// 所有用户的角色（用户列表一次取出）
    pub async fn all_roles(&self) -> Result<HashMap<Uuid, Vec<Role>>, AppError> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as("SELECT user_id, role FROM user_roles")
            .fetch_all(&self.db)
            .await?;

        let mut grouped: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (user_id, role) in rows {
            grouped.entry(user_id).or_default().push(role);
        }
        Ok(grouped
            .into_iter()
            .map(|(id, names)| (id, parse_roles(names)))
            .collect())
    }

    /// 替换为单一角色
    pub async fn replace_roles(&self, id: Uuid, role: Role) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
            .bind(id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn any_with_role(&self, role: Role) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM user_roles WHERE role = $1)")
                .bind(role.as_str())
                .fetch_one(&self.db)
                .await?;
        Ok(exists)
    }

    // ==================== Credentials & lockout ====================

    pub async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(hash)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    pub async fn set_lockout_end(&self, id: Uuid, end: Option<DateTime<Utc>>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET lockout_end = $1, updated_at = NOW() WHERE id = $2")
            .bind(end)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    pub async fn reset_access_failed_count(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET access_failed_count = 0 WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// 失败计数加一并返回新值
    pub async fn increment_access_failed_count(&self, id: Uuid) -> Result<i32, AppError> {
        let count: i32 = sqlx::query_scalar(
            "UPDATE users SET access_failed_count = access_failed_count + 1 WHERE id = $1 RETURNING access_failed_count",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roles_skips_unknown_and_orders() {
        let roles = parse_roles(vec![
            "Employee".to_string(),
            "legacy".to_string(),
            "Admin".to_string(),
        ]);
        assert_eq!(roles, vec![Role::Admin, Role::Employee]);
    }
}
