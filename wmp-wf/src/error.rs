//! HTTP error mapping for wmp-wf
//!
//! Every failure is rendered in the shared envelope. Persistence and
//! external-service causes are logged and replaced with a generic message.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use wmp_common::api::ApiEnvelope;
use wmp_common::Error as WorkflowError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request body or path (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Error raised by a workflow operation
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Workflow(err) => match err {
                WorkflowError::Validation(msg) | WorkflowError::Precondition(msg) => {
                    (StatusCode::BAD_REQUEST, msg.clone())
                }
                WorkflowError::Authorization(msg) => (StatusCode::FORBIDDEN, msg.clone()),
                WorkflowError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
                WorkflowError::ExternalService(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A required external service failed, please retry later".to_string(),
                ),
                WorkflowError::Persistence(_)
                | WorkflowError::Io(_)
                | WorkflowError::Config(_)
                | WorkflowError::Internal(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, Json(ApiEnvelope::error(message))).into_response()
    }
}

/// Handler result type
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (WorkflowError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (WorkflowError::Precondition("x".into()), StatusCode::BAD_REQUEST),
            (WorkflowError::Authorization("x".into()), StatusCode::FORBIDDEN),
            (WorkflowError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (WorkflowError::ExternalService("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (WorkflowError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_and_message().0, expected);
        }
    }

    #[test]
    fn test_internal_causes_not_echoed() {
        let err = ApiError::from(WorkflowError::ExternalService(
            "http://10.0.0.3:5800 refused connection".into(),
        ));
        let (_, message) = err.status_and_message();
        assert!(!message.contains("10.0.0.3"));

        let err = ApiError::from(WorkflowError::Persistence(sqlx::Error::RowNotFound));
        assert_eq!(err.status_and_message().1, "Internal server error");
    }
}
