//! 用户管理的 HTTP 处理器（Admin）

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::Actor,
    error::AppError,
    middleware::AppState,
    models::user::{AssignRoleRequest, LinkEmployeeRequest},
};

/// 列出用户（角色、锁定状态、登录统计、关联员工）
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let users = state.account_service.list_users().await?;
    Ok(Json(users))
}

pub async fn assign_role(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.account_service.assign_role(&actor, id, req.role).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unlock_user(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.account_service.unlock(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn linkable_employees(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let employees = state.account_service.linkable_employees(id).await?;
    Ok(Json(employees))
}

pub async fn link_employee(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<LinkEmployeeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let employee = state
        .account_service
        .link_employee(&actor, id, req.employee_id)
        .await?;
    Ok(Json(employee))
}

pub async fn unlink_employee(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.account_service.unlink_employee(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
