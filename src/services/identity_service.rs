//! 身份提供者：账户、角色、密码与锁定
//! 服务层只依赖 [`IdentityProvider`]，默认实现基于 users / user_roles 表

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::{PasswordHasher, PasswordPolicy, Role},
    config::SecurityConfig,
    error::{AppError, FieldErrors},
    models::user::{NewUser, User},
    repository::UserRepository,
};

/// 一次失败登录的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessFailure {
    /// 本次失败后的计数（达到上限并锁定后归零）
    pub failed_count: i32,
    /// 本次失败触发锁定时的解锁时间
    pub locked_until: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    async fn create_user(
        &self,
        email: &str,
        password: &str,
        email_confirmed: bool,
    ) -> Result<User, AppError>;

    /// 修改邮箱（同时作为用户名）与电话；邮箱变更时 email_confirmed 清零
    async fn update_profile(&self, id: Uuid, email: &str, phone: Option<&str>) -> Result<User, AppError>;

    async fn verify_password(&self, user: &User, password: &str) -> Result<bool, AppError>;
    async fn change_password(&self, id: Uuid, current: &str, new: &str) -> Result<(), AppError>;

    async fn roles_of(&self, id: Uuid) -> Result<Vec<Role>, AppError>;
    async fn all_roles(&self) -> Result<HashMap<Uuid, Vec<Role>>, AppError>;
    /// 替换为单一角色
    async fn assign_role(&self, id: Uuid, role: Role) -> Result<(), AppError>;
    async fn any_with_role(&self, role: Role) -> Result<bool, AppError>;

    async fn lockout_end(&self, id: Uuid) -> Result<Option<DateTime<Utc>>, AppError>;
    async fn set_lockout_end(&self, id: Uuid, end: Option<DateTime<Utc>>) -> Result<(), AppError>;
    async fn reset_access_failed_count(&self, id: Uuid) -> Result<(), AppError>;
    /// 计数加一；达到上限时锁定并归零计数
    async fn record_access_failure(&self, user: &User) -> Result<AccessFailure, AppError>;
}

pub struct PgIdentityProvider {
    users: UserRepository,
    hasher: PasswordHasher,
    policy: PasswordPolicy,
    max_failed_attempts: i32,
    lockout: Duration,
}

impl PgIdentityProvider {
    pub fn new(db: PgPool, security: &SecurityConfig) -> Self {
        Self {
            users: UserRepository::new(db),
            hasher: PasswordHasher::new(),
            policy: PasswordPolicy::from_config(security),
            max_failed_attempts: security.max_failed_access_attempts as i32,
            lockout: Duration::minutes(security.lockout_minutes),
        }
    }

    fn check_policy(&self, field: &str, password: &str) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        for message in self.policy.violations(password) {
            errors.add(field, message);
        }
        errors.into_result()
    }
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.users.find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.users.find_by_email(email).await
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.users.list_all().await
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
        email_confirmed: bool,
    ) -> Result<User, AppError> {
        self.check_policy("password", password)?;
        let user = self
            .users
            .insert(&NewUser {
                email: email.trim().to_string(),
                password_hash: self.hasher.hash(password)?,
                phone: None,
                email_confirmed,
            })
            .await?;
        tracing::info!(user_id = %user.id, email = %user.email, "User created");
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, email: &str, phone: Option<&str>) -> Result<User, AppError> {
        let current = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let email = email.trim();
        let email_changed = !current.email.eq_ignore_ascii_case(email);
        if email_changed && self.users.email_taken_by_other(email, id).await? {
            return Err(AppError::duplicate(
                "email",
                "This email is already in use by another account.",
            ));
        }

        let confirmed = current.email_confirmed && !email_changed;
        self.users
            .update_profile(id, email, phone, confirmed)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    async fn verify_password(&self, user: &User, password: &str) -> Result<bool, AppError> {
        match self.hasher.verify(password, &user.password_hash) {
            Ok(()) => Ok(true),
            Err(AppError::Unauthorized) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn change_password(&self, id: Uuid, current: &str, new: &str) -> Result<(), AppError> {
        let user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        if !self.verify_password(&user, current).await? {
            return Err(AppError::Validation(FieldErrors::single(
                "current_password",
                "Incorrect password.",
            )));
        }
        self.check_policy("new_password", new)?;

        let hash = self.hasher.hash(new)?;
        self.users.set_password_hash(id, &hash).await
    }

    async fn roles_of(&self, id: Uuid) -> Result<Vec<Role>, AppError> {
        self.users.roles_of(id).await
    }

    async fn all_roles(&self) -> Result<HashMap<Uuid, Vec<Role>>, AppError> {
        self.users.all_roles().await
    }

    async fn assign_role(&self, id: Uuid, role: Role) -> Result<(), AppError> {
        self.users.replace_roles(id, role).await
    }

    async fn any_with_role(&self, role: Role) -> Result<bool, AppError> {
        self.users.any_with_role(role).await
    }

    async fn lockout_end(&self, id: Uuid) -> Result<Option<DateTime<Utc>>, AppError> {
        Ok(self
            .users
            .find_by_id(id)
            .await?
            .and_then(|u| u.lockout_end))
    }

    async fn set_lockout_end(&self, id: Uuid, end: Option<DateTime<Utc>>) -> Result<(), AppError> {
        self.users.set_lockout_end(id, end).await
    }

    async fn reset_access_failed_count(&self, id: Uuid) -> Result<(), AppError> {
        self.users.reset_access_failed_count(id).await
    }

    async fn record_access_failure(&self, user: &User) -> Result<AccessFailure, AppError> {
        let count = self.users.increment_access_failed_count(user.id).await?;
        if !user.lockout_enabled || count < self.max_failed_attempts {
            return Ok(AccessFailure {
                failed_count: count,
                locked_until: None,
            });
        }

        let until = Utc::now() + self.lockout;
        self.users.set_lockout_end(user.id, Some(until)).await?;
        self.users.reset_access_failed_count(user.id).await?;
        tracing::warn!(user_id = %user.id, until = %until, "Account locked out");

        Ok(AccessFailure {
            failed_count: 0,
            locked_until: Some(until),
        })
    }
}

/// 没有任何管理员时，创建（或提升）配置中的初始管理员账户
pub async fn bootstrap_admin(
    identity: &dyn IdentityProvider,
    security: &SecurityConfig,
) -> Result<(), AppError> {
    if identity.any_with_role(Role::Admin).await? {
        return Ok(());
    }

    let email = security.bootstrap_admin_email.trim();
    let user = match identity.find_by_email(email).await? {
        Some(user) => user,
        None => {
            identity
                .create_user(email, security.bootstrap_admin_password.expose_secret(), true)
                .await?
        }
    };
    identity.assign_role(user.id, Role::Admin).await?;

    tracing::info!(email = %user.email, "Bootstrap administrator ensured");
    Ok(())
}
