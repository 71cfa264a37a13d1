//! HTTP 中间件与应用状态
//! 请求追踪（trace_id / request_id、指标、日志）

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    auth::jwt::JwtService,
    config::AppConfig,
    services::{
        AccountService, AuditService, AuthService, DepartmentService, EmployeeService,
        IdentityProvider, JobTitleService, StorageService,
    },
};

/// 应用状态：服务以 Arc 共享，handler 通过 `State<Arc<AppState>>` 访问
pub struct AppState {
    pub config: AppConfig,
    pub db: sqlx::PgPool,
    pub jwt_service: Arc<JwtService>,
    pub identity: Arc<dyn IdentityProvider>,
    pub audit_service: Arc<AuditService>,
    pub storage_service: Arc<StorageService>,
    pub auth_service: Arc<AuthService>,
    pub employee_service: Arc<EmployeeService>,
    pub department_service: Arc<DepartmentService>,
    pub job_title_service: Arc<JobTitleService>,
    pub account_service: Arc<AccountService>,
}

impl AppState {
    /// 按依赖顺序组装全部服务
    pub fn new(config: AppConfig, db: sqlx::PgPool, jwt_service: Arc<JwtService>) -> Self {
        let identity: Arc<dyn IdentityProvider> = Arc::new(
            crate::services::PgIdentityProvider::new(db.clone(), &config.security),
        );
        let audit_service = Arc::new(AuditService::new(db.clone(), config.audit.retention_days));
        let storage_service = Arc::new(StorageService::new(&config.storage));

        let auth_service = Arc::new(AuthService::new(
            identity.clone(),
            audit_service.clone(),
            jwt_service.clone(),
        ));
        let employee_service = Arc::new(EmployeeService::new(
            db.clone(),
            audit_service.clone(),
            storage_service.clone(),
        ));
        let department_service = Arc::new(DepartmentService::new(db.clone(), audit_service.clone()));
        let job_title_service = Arc::new(JobTitleService::new(db.clone(), audit_service.clone()));
        let account_service = Arc::new(AccountService::new(
            db.clone(),
            identity.clone(),
            audit_service.clone(),
            jwt_service.clone(),
        ));

        Self {
            config,
            db,
            jwt_service,
            identity,
            audit_service,
            storage_service,
            auth_service,
            employee_service,
            department_service,
            job_title_service,
            account_service,
        }
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let uri = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    async move {
        let start = Instant::now();
        let mut response = next.run(req).await;
        let elapsed = start.elapsed();

        // 指标标签使用静态字符串
        let status = response.status().as_u16();
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            _ => "OTHER",
        };
        let status_class = match status {
            200..=299 => "2xx",
            300..=399 => "3xx",
            400..=499 => "4xx",
            _ => "5xx",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_class)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            uri = %uri,
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
