//! 员工管理的 HTTP 处理器（Admin / Manager）

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::Actor,
    error::AppError,
    handlers::attachment,
    middleware::AppState,
    models::employee::*,
    report::ReportFormat,
    services::storage_service::Upload,
};

/// 员工列表（过滤、排序、分页，附带统计与下拉选项）
pub async fn list_employees(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<EmployeeFilter>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.employee_service.list(&filter).await?;
    Ok(Json(response))
}

pub async fn form_options(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let options = state.employee_service.form_options().await?;
    Ok(Json(options))
}

pub async fn get_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let employee = state.employee_service.get(id).await?;
    Ok(Json(employee))
}

pub async fn create_employee(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(req): Json<CreateEmployeeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let employee = state.employee_service.create(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

pub async fn update_employee(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEmployeeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let employee = state.employee_service.update(&actor, id, req).await?;
    Ok(Json(employee))
}

/// 停用（软删除）
pub async fn deactivate_employee(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let employee = state.employee_service.deactivate(&actor, id).await?;
    Ok(Json(employee))
}

/// 上传头像（multipart，字段名 photo 或 file）
pub async fn upload_photo(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart request: {}", e)))?
    {
        if matches!(field.name(), Some("photo") | Some("file")) {
            let file_name = field.file_name().unwrap_or("photo").to_string();
            let content_type = field.content_type().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid multipart request: {}", e)))?;
            upload = Some(Upload {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
            break;
        }
    }

    let upload = upload.ok_or_else(|| AppError::BadRequest("No 'photo' field found".to_string()))?;
    let employee = state.employee_service.update_photo(&actor, id, upload).await?;
    Ok(Json(employee))
}

pub async fn export_pdf(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(filter): Query<EmployeeFilter>,
) -> Result<impl IntoResponse, AppError> {
    let file = state
        .employee_service
        .export_list(&actor, &filter, ReportFormat::Pdf)
        .await?;
    Ok(attachment(file))
}

pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(filter): Query<EmployeeFilter>,
) -> Result<impl IntoResponse, AppError> {
    let file = state
        .employee_service
        .export_list(&actor, &filter, ReportFormat::Csv)
        .await?;
    Ok(attachment(file))
}

/// 单个员工详情 PDF
pub async fn export_detail_pdf(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let file = state.employee_service.export_detail(&actor, id).await?;
    Ok(attachment(file))
}
