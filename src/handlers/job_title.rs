//! 职位管理的 HTTP 处理器（Admin）

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
    models::job_title::*,
};

pub async fn list_job_titles(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<JobTitleFilter>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.job_title_service.list(&filter).await?;
    Ok(Json(response))
}

pub async fn get_job_title(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let job_title = state.job_title_service.get(id).await?;
    Ok(Json(job_title))
}

pub async fn create_job_title(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(req): Json<JobTitleFields>,
) -> Result<impl IntoResponse, AppError> {
    let job_title = state.job_title_service.create(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(job_title)))
}

pub async fn update_job_title(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateJobTitleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let job_title = state.job_title_service.update(&actor, id, req).await?;
    Ok(Json(job_title))
}

pub async fn delete_job_title(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.job_title_service.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export_pdf(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(filter): Query<JobTitleFilter>,
) -> Result<impl IntoResponse, AppError> {
    let file = state.job_title_service.export_pdf(&actor, &filter).await?;
    Ok(attachment(file))
}
