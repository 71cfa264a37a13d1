//! 角色与访问控制
//!
//! 路由层守卫在 handler 之前执行：未认证返回 401，角色不足返回 403，
//! 均不会触达任何数据访问。

use std::fmt;
use std::str::FromStr;

use axum::{extract::Request, middleware::Next, response::Response};
use serde::{Deserialize, Serialize};

use crate::{auth::middleware::Actor, error::AppError};

/// 系统角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Employee];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Manager => "Manager",
            Role::Employee => "Employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::BadRequest(format!("Unknown role: {}", s)))
    }
}

/// 操作者至少拥有其中一个角色
pub fn require_role(actor: &Actor, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.iter().any(|r| actor.has_role(*r)) {
        Ok(())
    } else {
        tracing::warn!(
            actor = %actor.email,
            required = ?allowed,
            "Access denied: missing role"
        );
        Err(AppError::Forbidden)
    }
}

fn guard(req: &Request, allowed: &[Role]) -> Result<(), AppError> {
    let actor = req
        .extensions()
        .get::<Actor>()
        .ok_or(AppError::Unauthorized)?;
    require_role(actor, allowed)
}

/// 仅管理员
pub async fn admin_only(req: Request, next: Next) -> Result<Response, AppError> {
    guard(&req, &[Role::Admin])?;
    Ok(next.run(req).await)
}

/// 管理员或经理
pub async fn admin_or_manager(req: Request, next: Next) -> Result<Response, AppError> {
    guard(&req, &[Role::Admin, Role::Manager])?;
    Ok(next.run(req).await)
}
