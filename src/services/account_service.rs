//! 账户服务：员工关联、用户管理、个人资料与安全视图

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{Actor, JwtService, Role},
    error::AppError,
    models::{
        employee::{years_of_service, EmployeeDetail, EmployeeView},
        user::*,
    },
    repository::EmployeeRepository,
    services::{
        audit_service::{AuditAction, AuditEntry, AuditService},
        identity_service::IdentityProvider,
    },
};

/// 安全视图中每类记录的条数
const RECENT_LIMIT: i64 = 10;

fn linked(employee: &EmployeeView) -> LinkedEmployee {
    LinkedEmployee {
        id: employee.id,
        full_name: employee.full_name.clone(),
        department_name: employee.department_name.clone(),
        job_title: employee.job_title.clone(),
    }
}

pub struct AccountService {
    db: PgPool,
    identity: Arc<dyn IdentityProvider>,
    audit: Arc<AuditService>,
    jwt_service: Arc<JwtService>,
}

impl AccountService {
    pub fn new(
        db: PgPool,
        identity: Arc<dyn IdentityProvider>,
        audit: Arc<AuditService>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            db,
            identity,
            audit,
            jwt_service,
        }
    }

    fn employees(&self) -> EmployeeRepository {
        EmployeeRepository::new(self.db.clone())
    }

    async fn user(&self, id: Uuid) -> Result<User, AppError> {
        self.identity
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    // ==================== Account linking ====================

    /// 先按 user_id 关联查找，再按邮箱（不区分大小写）匹配
    pub async fn resolve_employee(&self, user: &User) -> Result<Option<EmployeeView>, AppError> {
        let repo = self.employees();
        if let Some(employee) = repo.find_by_user_id(user.id).await? {
            return Ok(Some(employee));
        }
        repo.find_by_email(&user.email).await
    }

    pub async fn linkable_employees(&self, user_id: Uuid) -> Result<Vec<EmployeeView>, AppError> {
        self.user(user_id).await?;
        self.employees().linkable_for(user_id).await
    }

    /// 同一事务内：解除该账户的其他关联、关联到目标员工、写审计
    pub async fn link_employee(
        &self,
        actor: &Actor,
        user_id: Uuid,
        employee_id: Uuid,
    ) -> Result<EmployeeView, AppError> {
        let user = self.user(user_id).await?;

        let mut tx = self.db.begin().await?;
        let employee = EmployeeRepository::lock(&mut *tx, employee_id)
            .await?
            .ok_or_else(|| AppError::not_found("Employee"))?;

        EmployeeRepository::clear_user_link(&mut *tx, user.id).await?;
        EmployeeRepository::set_user_link(&mut *tx, employee.id, user.id)
            .await?
            .ok_or_else(|| AppError::not_found("Employee"))?;

        let name = employee.full_name();
        AuditService::record(
            &mut *tx,
            AuditEntry::new(
                AuditAction::UserLinked {
                    email: &user.email,
                    employee: &name,
                },
                actor.name(),
            )
            .employee(employee.id),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, employee_id = %employee.id, "User linked to employee");
        self.employees()
            .find_view(employee.id)
            .await?
            .ok_or_else(|| AppError::not_found("Employee"))
    }

    pub async fn unlink_employee(&self, actor: &Actor, user_id: Uuid) -> Result<(), AppError> {
        let user = self.user(user_id).await?;
        let employee = self
            .employees()
            .find_by_user_id(user.id)
            .await?
            .ok_or_else(|| AppError::not_found("Employee link"))?;

        let mut tx = self.db.begin().await?;
        EmployeeRepository::clear_user_link(&mut *tx, user.id).await?;
        AuditService::record(
            &mut *tx,
            AuditEntry::new(
                AuditAction::UserUnlinked {
                    email: &user.email,
                    employee: &employee.full_name,
                },
                actor.name(),
            )
            .employee(employee.id),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, employee_id = %employee.id, "User unlinked from employee");
        Ok(())
    }

    // ==================== User administration ====================

    pub async fn list_users(&self) -> Result<Vec<UserListItem>, AppError> {
        let users = self.identity.list_users().await?;
        let mut roles = self.identity.all_roles().await?;
        let now = Utc::now();

        let mut items = Vec::with_capacity(users.len());
        for user in users {
            let failed_login_count = self.audit.failed_logins_since_reset(&user.email).await?;
            let last_login = self.audit.last_successful_login(&user.email).await?;
            let linked_employee = self.resolve_employee(&user).await?.as_ref().map(linked);

            items.push(UserListItem {
                id: user.id,
                is_locked_out: user.is_locked_out(now),
                roles: roles.remove(&user.id).unwrap_or_default(),
                email: user.email,
                username: user.username,
                email_confirmed: user.email_confirmed,
                lockout_enabled: user.lockout_enabled,
                failed_login_count,
                last_login,
                linked_employee,
            });
        }
        Ok(items)
    }

    /// 替换为单一角色
    pub async fn assign_role(&self, actor: &Actor, user_id: Uuid, role: Role) -> Result<(), AppError> {
        let user = self.user(user_id).await?;
        self.identity.assign_role(user.id, role).await?;
        self.audit
            .record_now(AuditEntry::new(
                AuditAction::RoleAssigned {
                    role: role.as_str(),
                    email: &user.email,
                },
                actor.name(),
            ))
            .await?;

        tracing::info!(user_id = %user.id, role = %role, "Role assigned");
        Ok(())
    }

    /// 解除锁定并写入清零标记；失败统计从标记之后重新计算
    pub async fn unlock(&self, actor: &Actor, user_id: Uuid) -> Result<(), AppError> {
        let user = self.user(user_id).await?;
        self.identity.set_lockout_end(user.id, None).await?;
        self.identity.reset_access_failed_count(user.id).await?;

        self.audit
            .record_now(
                AuditEntry::new(AuditAction::LoginFailedReset, &user.email).details(format!(
                    "Failed login attempts cleared by admin {}",
                    actor.name()
                )),
            )
            .await?;

        tracing::info!(user_id = %user.id, admin = %actor.name(), "Account unlocked");
        Ok(())
    }

    // ==================== Profile ====================

    pub async fn profile(&self, actor: &Actor) -> Result<UserProfile, AppError> {
        let user = self.user(actor.user_id).await?;
        let roles = self.identity.roles_of(user.id).await?;
        let employee = self.resolve_employee(&user).await?.as_ref().map(linked);

        Ok(UserProfile {
            id: user.id,
            email: user.email,
            username: user.username,
            phone: user.phone,
            email_confirmed: user.email_confirmed,
            roles,
            employee,
        })
    }

    /// 关联员工的详细信息
    pub async fn my_employee(&self, actor: &Actor) -> Result<EmployeeDetail, AppError> {
        let user = self.user(actor.user_id).await?;
        let employee = self
            .resolve_employee(&user)
            .await?
            .ok_or_else(|| AppError::not_found("Linked employee"))?;
        let years_of_service = years_of_service(employee.hire_date, Utc::now().date_naive());
        Ok(EmployeeDetail {
            employee,
            years_of_service,
        })
    }

    pub async fn update_profile(
        &self,
        actor: &Actor,
        req: UpdateProfileRequest,
    ) -> Result<UpdatedProfile, AppError> {
        req.validate()?;
        let phone = req
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());

        let before = self.user(actor.user_id).await?;
        let user = self
            .identity
            .update_profile(actor.user_id, &req.email, phone)
            .await?;

        let email_changed = !before.email.eq_ignore_ascii_case(&user.email);
        let mut entry = AuditEntry::new(AuditAction::ProfileUpdated, actor.name());
        if email_changed {
            entry = entry.details(format!("Email changed to {}", user.email));
        }
        self.audit.record_now(entry).await?;

        let profile = self.profile(actor).await?;

        // 令牌中的邮箱即审计操作者，邮箱变更后重新签发
        let access_token = if email_changed {
            let token = self.jwt_service.generate_access_token(
                &user.id,
                &user.email,
                profile.roles.iter().map(|r| r.as_str().to_string()).collect(),
            )?;
            tracing::info!(user_id = %user.id, "Access token reissued after email change");
            Some(token)
        } else {
            None
        };

        Ok(UpdatedProfile {
            profile,
            access_token,
        })
    }

    pub async fn change_password(&self, actor: &Actor, req: ChangePasswordRequest) -> Result<(), AppError> {
        req.validate()?;
        self.identity
            .change_password(actor.user_id, &req.current_password, &req.new_password)
            .await?;
        self.audit
            .record_now(AuditEntry::new(AuditAction::PasswordChanged, actor.name()))
            .await?;

        tracing::info!(user_id = %actor.user_id, "Password changed");
        Ok(())
    }

    pub async fn security(&self, actor: &Actor) -> Result<SecurityView, AppError> {
        let user = self.user(actor.user_id).await?;
        let stats = self.audit.login_stats(&user.email).await?;
        let login_history = self.audit.login_history(&user.email, RECENT_LIMIT).await?;
        let recent_activity = self.audit.other_activity(&user.email, RECENT_LIMIT).await?;
        let lockout_end = self.identity.lockout_end(user.id).await?;

        Ok(SecurityView {
            id: user.id,
            email: user.email,
            email_confirmed: user.email_confirmed,
            lockout_enabled: user.lockout_enabled,
            lockout_end,
            access_failed_count: user.access_failed_count,
            failed_attempts_since_reset: stats.failed_since_reset,
            total_successful_logins: stats.total_successful,
            last_successful_login: stats.last_successful,
            last_failed_login: stats.last_failed,
            login_history,
            recent_activity,
        })
    }
}
