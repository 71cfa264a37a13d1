//! 错误响应格式测试

use axum::{http::StatusCode, response::IntoResponse};
use http_body_util::BodyExt;
use hr_admin::error::{AppError, FieldErrors};

async fn body_json(error: AppError) -> (StatusCode, serde_json::Value) {
    let response = error.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_validation_error_lists_fields() {
    let mut errors = FieldErrors::new();
    errors.add("first_name", "First name must be between 2 and 50 characters");
    errors.add("salary", "Salary must be between 0.01 and 9,999,999.99");

    let (status, json) = body_json(AppError::Validation(errors)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], 422);
    assert_eq!(
        json["error"]["fields"]["salary"][0],
        "Salary must be between 0.01 and 9,999,999.99"
    );
    assert!(json["error"]["request_id"].is_string());
}

#[tokio::test]
async fn test_duplicate_key_is_conflict_with_field() {
    let (status, json) = body_json(AppError::duplicate(
        "name",
        "A department with this name already exists.",
    ))
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["message"], "A department with this name already exists.");
    assert!(json["error"]["fields"]["name"].is_array());
}

#[tokio::test]
async fn test_referential_block_message_is_shown() {
    let message = "Cannot delete department 'Legal' because it has employees assigned to it.";
    let (status, json) = body_json(AppError::ReferentialBlock(message.to_string())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["message"], message);
    assert!(json["error"].get("fields").is_none());
}

#[tokio::test]
async fn test_concurrency_conflict() {
    let (status, json) = body_json(AppError::ConcurrencyConflict).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("modified by another user"));
}

#[tokio::test]
async fn test_internal_errors_hide_details() {
    let (status, json) = body_json(AppError::Internal("pool exhausted at 10.0.0.3".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["message"], "Internal server error");
}
