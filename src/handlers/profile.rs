//! 个人资料的 HTTP 处理器（任意已登录用户）

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::{
    auth::Actor,
    error::AppError,
    middleware::AppState,
    models::user::{ChangePasswordRequest, UpdateProfileRequest},
};

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.account_service.profile(&actor).await?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.account_service.update_profile(&actor, req).await?;
    Ok(Json(profile))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.account_service.change_password(&actor, req).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 登录历史与安全状态
pub async fn security(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    let view = state.account_service.security(&actor).await?;
    Ok(Json(view))
}

pub async fn my_employee(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    let employee = state.account_service.my_employee(&actor).await?;
    Ok(Json(employee))
}
