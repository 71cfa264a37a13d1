//! 认证与角色拦截 API 集成测试

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use hr_admin::auth::Role;
use serde_json::json;
use serial_test::serial;
use tower::ServiceExt;

mod common;
use common::{bearer_token, create_test_app_state, create_test_config, lazy_pool};

fn lazy_app() -> (std::sync::Arc<hr_admin::middleware::AppState>, axum::Router) {
    let config = create_test_config();
    let pool = lazy_pool(&config);
    let state = create_test_app_state(config, pool);
    let app = hr_admin::routes::create_router(state.clone());
    (state, app)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let (_, app) = lazy_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/employees")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], 401);
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let (_, app) = lazy_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/profile")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_employee_role_cannot_manage_employees() {
    let (state, app) = lazy_app();
    let token = bearer_token(&state, "staff@company.com", &[Role::Employee]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/employees")
                .header(header::AUTHORIZATION, token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_manager_cannot_reach_admin_areas() {
    let (state, app) = lazy_app();
    let token = bearer_token(&state, "manager@company.com", &[Role::Manager]);

    for uri in [
        "/api/v1/departments",
        "/api/v1/job-titles",
        "/api/v1/audit-logs",
        "/api/v1/users",
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(header::AUTHORIZATION, token.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
    }
}

#[tokio::test]
async fn test_manager_passes_employee_guard() {
    let (state, app) = lazy_app();
    let token = bearer_token(&state, "manager@company.com", &[Role::Manager]);

    // 通过角色检查后，请求体缺少必填字段，在访问数据库之前就被拒绝
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/employees")
                .header(header::AUTHORIZATION, token)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_login_validates_request() {
    let (_, app) = lazy_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": "not-an-email", "password": "" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = json_body(response).await;
    assert!(json["error"]["fields"]["email"].is_array());
    assert!(json["error"]["fields"]["password"].is_array());
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_login_success_and_lockout() {
    let config = create_test_config();
    let pool = common::setup_test_db(&config).await;
    let state = create_test_app_state(config, pool.clone());
    common::create_test_user(&state, "hr@company.com", "Secret@123", Role::Manager).await;
    let app = hr_admin::routes::create_router(state.clone());

    let login = |password: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "email": "hr@company.com", "password": password }).to_string(),
            ))
            .unwrap()
    };

    let response = app.clone().oneshot(login("Secret@123")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["access_token"].is_string());
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["user"]["email"], "hr@company.com");
    assert_eq!(json["user"]["roles"][0], "Manager");

    // 测试配置中 3 次失败即锁定
    for _ in 0..3 {
        let response = app.clone().oneshot(login("Wrong@123")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app.clone().oneshot(login("Secret@123")).await.unwrap();
    assert_eq!(response.status(), StatusCode::LOCKED);

    let (locked_out,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM audit_logs WHERE action = 'Account Locked Out' AND actor = 'hr@company.com'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(locked_out, 1);
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_login_unknown_email_writes_no_audit() {
    let config = create_test_config();
    let pool = common::setup_test_db(&config).await;
    let state = create_test_app_state(config, pool.clone());
    let app = hr_admin::routes::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": "nobody@company.com", "password": "Secret@123" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_logs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
