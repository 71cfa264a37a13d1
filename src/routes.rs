//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    auth::{
        guard::{admin_only, admin_or_manager},
        jwt_auth_middleware,
    },
    handlers,
    middleware::{request_tracking_middleware, AppState},
};

/// multipart 头部开销余量
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/api/v1/auth/login", post(handlers::auth::login));

    // 任意已登录用户
    let profile_routes = Router::new()
        .route(
            "/api/v1/profile",
            get(handlers::profile::get_profile).put(handlers::profile::update_profile),
        )
        .route("/api/v1/profile/password", put(handlers::profile::change_password))
        .route("/api/v1/profile/security", get(handlers::profile::security))
        .route("/api/v1/profile/employee", get(handlers::profile::my_employee));

    // 管理员或经理：员工管理
    let employee_routes = Router::new()
        .route(
            "/api/v1/employees",
            get(handlers::employee::list_employees).post(handlers::employee::create_employee),
        )
        .route("/api/v1/employees/form-options", get(handlers::employee::form_options))
        .route("/api/v1/employees/export/pdf", get(handlers::employee::export_pdf))
        .route("/api/v1/employees/export/csv", get(handlers::employee::export_csv))
        .route(
            "/api/v1/employees/{id}",
            get(handlers::employee::get_employee)
                .put(handlers::employee::update_employee)
                .delete(handlers::employee::deactivate_employee),
        )
        .route(
            "/api/v1/employees/{id}/photo",
            put(handlers::employee::upload_photo).layer(DefaultBodyLimit::max(
                state.storage_service.max_upload_bytes() + MULTIPART_OVERHEAD,
            )),
        )
        .route(
            "/api/v1/employees/{id}/export/pdf",
            get(handlers::employee::export_detail_pdf),
        )
        .route_layer(from_fn(admin_or_manager));

    // 仅管理员：部门、职位、审计、用户
    let admin_routes = Router::new()
        .route(
            "/api/v1/departments",
            get(handlers::department::list_departments).post(handlers::department::create_department),
        )
        .route("/api/v1/departments/export/pdf", get(handlers::department::export_pdf))
        .route(
            "/api/v1/departments/{id}",
            get(handlers::department::get_department)
                .put(handlers::department::update_department)
                .delete(handlers::department::delete_department),
        )
        .route(
            "/api/v1/job-titles",
            get(handlers::job_title::list_job_titles).post(handlers::job_title::create_job_title),
        )
        .route("/api/v1/job-titles/export/pdf", get(handlers::job_title::export_pdf))
        .route(
            "/api/v1/job-titles/{id}",
            get(handlers::job_title::get_job_title)
                .put(handlers::job_title::update_job_title)
                .delete(handlers::job_title::delete_job_title),
        )
        .route("/api/v1/audit-logs", get(handlers::audit::list_audit_logs))
        .route("/api/v1/audit-logs/export/csv", get(handlers::audit::export_csv))
        .route("/api/v1/audit-logs/export/pdf", get(handlers::audit::export_pdf))
        .route("/api/v1/audit-logs/purge", post(handlers::audit::purge_audit_logs))
        .route("/api/v1/audit-logs/{id}", get(handlers::audit::get_audit_log))
        .route("/api/v1/users", get(handlers::account::list_users))
        .route("/api/v1/users/{id}/role", put(handlers::account::assign_role))
        .route("/api/v1/users/{id}/unlock", post(handlers::account::unlock_user))
        .route(
            "/api/v1/users/{id}/linkable-employees",
            get(handlers::account::linkable_employees),
        )
        .route(
            "/api/v1/users/{id}/employee-link",
            put(handlers::account::link_employee).delete(handlers::account::unlink_employee),
        )
        .route_layer(from_fn(admin_only));

    // 需要认证的路由：先认证，再由各组的 route_layer 检查角色
    let authenticated_routes = Router::new()
        .merge(profile_routes)
        .merge(employee_routes)
        .merge(admin_routes)
        .layer(from_fn_with_state(
            state.jwt_service.clone(),
            jwt_auth_middleware,
        ));

    // 头像等静态文件
    let images = ServeDir::new(state.storage_service.web_root().join("images"));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .nest_service("/images", images)
        .layer(from_fn(request_tracking_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state)
}
