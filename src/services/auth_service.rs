//! 认证服务：登录、失败计数与锁定

use std::sync::Arc;

use chrono::Utc;

use crate::{
    auth::jwt::JwtService,
    error::AppError,
    models::user::{LoginRequest, LoginResponse, UserInfo},
    services::{
        audit_service::{AuditAction, AuditEntry, AuditService},
        identity_service::IdentityProvider,
    },
};

pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    audit: Arc<AuditService>,
    jwt_service: Arc<JwtService>,
}

impl AuthService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        audit: Arc<AuditService>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            identity,
            audit,
            jwt_service,
        }
    }

    /// 用户登录
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AppError> {
        // 未知邮箱没有可归属的操作者，不写审计
        let user = self
            .identity
            .find_by_email(req.email.trim())
            .await?
            .ok_or(AppError::Unauthorized)?;
        let actor = user.email.as_str();

        // 检查账户是否被锁定
        if user.is_locked_out(Utc::now()) {
            self.audit
                .record_now(
                    AuditEntry::new(AuditAction::LoginFailed, actor).details("Account locked out"),
                )
                .await?;
            tracing::warn!(user_id = %user.id, "Login rejected: account locked out");
            return Err(AppError::AccountLocked);
        }

        // 验证密码
        if !self.identity.verify_password(&user, &req.password).await? {
            let failure = self.identity.record_access_failure(&user).await?;
            self.audit
                .record_now(AuditEntry::new(AuditAction::LoginFailed, actor).details("Invalid password"))
                .await?;

            if let Some(until) = failure.locked_until {
                self.audit
                    .record_now(
                        AuditEntry::new(AuditAction::AccountLockedOut, actor)
                            .details(format!("Locked until {}", until.format("%Y-%m-%d %H:%M:%S UTC"))),
                    )
                    .await?;
            }
            tracing::warn!(user_id = %user.id, failed_count = failure.failed_count, "Login failed");
            return Err(AppError::Unauthorized);
        }

        // 重置失败次数
        if user.access_failed_count > 0 {
            self.identity.reset_access_failed_count(user.id).await?;
        }

        let roles = self.identity.roles_of(user.id).await?;
        let token = self.jwt_service.generate_access_token(
            &user.id,
            &user.email,
            roles.iter().map(|r| r.as_str().to_string()).collect(),
        )?;

        // 记录成功登录
        self.audit
            .record_now(AuditEntry::new(AuditAction::LoginSuccessful, actor))
            .await?;
        tracing::info!(user_id = %user.id, "Login successful");

        Ok(LoginResponse {
            access_token: token.access_token,
            token_type: token.token_type,
            expires_in: token.expires_in,
            user: UserInfo {
                id: user.id,
                email: user.email.clone(),
                roles,
            },
        })
    }
}
