//! 审计日志的 HTTP 处理器（Admin）

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::Actor, error::AppError, handlers::attachment, middleware::AppState,
    models::audit::AuditLogFilter, report::ReportFormat,
};

/// 查询审计日志
pub async fn list_audit_logs(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AuditLogFilter>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.audit_service.list(&filter).await?;
    Ok(Json(response))
}

pub async fn get_audit_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state.audit_service.get(id).await?;
    Ok(Json(entry))
}

pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(filter): Query<AuditLogFilter>,
) -> Result<impl IntoResponse, AppError> {
    let file = state
        .audit_service
        .export(&actor, &filter, ReportFormat::Csv)
        .await?;
    Ok(attachment(file))
}

pub async fn export_pdf(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(filter): Query<AuditLogFilter>,
) -> Result<impl IntoResponse, AppError> {
    let file = state
        .audit_service
        .export(&actor, &filter, ReportFormat::Pdf)
        .await?;
    Ok(attachment(file))
}

/// 清理超过保留期的记录
pub async fn purge_audit_logs(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    let result = state.audit_service.purge(&actor).await?;
    Ok(Json(result))
}
