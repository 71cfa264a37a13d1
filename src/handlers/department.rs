//! 部门管理的 HTTP 处理器（Admin）

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::Actor, error::AppError, handlers::attachment, middleware::AppState,
    models::department::*,
};

pub async fn list_departments(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<DepartmentFilter>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.department_service.list(&filter).await?;
    Ok(Json(response))
}

pub async fn get_department(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let department = state.department_service.get(id).await?;
    Ok(Json(department))
}

pub async fn create_department(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(req): Json<DepartmentFields>,
) -> Result<impl IntoResponse, AppError> {
    let department = state.department_service.create(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

pub async fn update_department(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDepartmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let department = state.department_service.update(&actor, id, req).await?;
    Ok(Json(department))
}

/// 仍有员工时返回 409
pub async fn delete_department(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.department_service.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export_pdf(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(filter): Query<DepartmentFilter>,
) -> Result<impl IntoResponse, AppError> {
    let file = state.department_service.export_pdf(&actor, &filter).await?;
    Ok(attachment(file))
}
