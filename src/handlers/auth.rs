//! 认证相关的 HTTP 处理器

use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;
use validator::Validate;

use crate::{error::AppError, middleware::AppState, models::user::LoginRequest};

/// 登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let response = state.auth_service.login(req).await?;
    Ok(Json(response))
}
