use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::errors::ServiceError;
use thiserror::Error;
use tracing::{debug, error};

/// Client-facing message for storage failures.
pub const STORAGE_FAILURE: &str = "storage operation failed";

/// Error body returned by every handler.
///
/// Field-level rejections render as `{"errors": {field: message}}`; everything
/// else renders as `{"error": ..., "message": ...}`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub error: &'static str,
    pub message: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: &'static str, message: Option<String>) -> Self {
        Self { status, error, message, fields: BTreeMap::new() }
    }

    /// 400 keyed by the offending request field.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.into(), message.into());
        Self { status: StatusCode::BAD_REQUEST, error: "Bad Request", message: None, fields }
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let body = if self.fields.is_empty() {
            serde_json::json!({"error": self.error, "message": self.message})
        } else {
            serde_json::json!({"errors": self.fields})
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation { field, message } => {
                debug!(%field, %message, "request rejected");
                Self::field(field, message)
            }
            ServiceError::InvalidId(raw) => {
                debug!(id = %raw, "malformed category id");
                Self::field("id", "invalid category id")
            }
            ServiceError::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, "Not Found", Some(msg)),
            // 存储错误细节只写日志，不返回给客户端
            ServiceError::Db(msg) => {
                error!(error = %msg, "storage failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", Some(STORAGE_FAILURE.to_string()))
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(e: JsonApiError) -> (StatusCode, serde_json::Value) {
        let res = e.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_maps_to_field_errors() {
        let (status, body) = body_of(ServiceError::validation("name", "category name is required").into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"errors": {"name": "category name is required"}}));
    }

    #[tokio::test]
    async fn invalid_id_is_keyed_by_id() {
        let (status, body) = body_of(ServiceError::InvalidId("abc".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]["id"].is_string());
    }

    #[tokio::test]
    async fn storage_failure_is_500() {
        let (status, body) = body_of(ServiceError::Db("connection reset".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal Server Error");
        assert_eq!(body["message"], STORAGE_FAILURE);
        assert!(!body.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn not_found_is_404() {
        let (status, _) = body_of(ServiceError::not_found("category").into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
