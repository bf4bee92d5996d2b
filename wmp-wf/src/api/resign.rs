//! Resignation endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use wmp_common::api::ApiEnvelope;

use super::{envelope, Caller};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ResignRequestBody {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResignDecisionBody {
    /// `approved` or `rejected`
    pub decision: String,
}

/// POST /api/resign-requests
pub async fn request_resign(
    State(state): State<AppState>,
    Caller(actor): Caller,
    body: Option<Json<ResignRequestBody>>,
) -> ApiResult<Json<ApiEnvelope>> {
    let request = body.map(|Json(body)| body).unwrap_or_default();
    let created = state.workflows.request_resign(&actor, request.reason).await?;
    envelope("Resign request submitted", &created)
}

/// POST /api/resign-requests/:id/decision
pub async fn decide_resign(
    State(state): State<AppState>,
    Caller(actor): Caller,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<ResignDecisionBody>, JsonRejection>,
) -> ApiResult<Json<ApiEnvelope>> {
    let Path(request_id) = path?;
    let Json(request) = body?;
    let decision = state
        .workflows
        .decide_resign(&actor, request_id, &request.decision)
        .await?;

    envelope(
        "Resign request decided",
        &json!({ "request_id": request_id, "decision": decision.as_str() }),
    )
}

pub fn resign_routes() -> Router<AppState> {
    Router::new()
        .route("/api/resign-requests", post(request_resign))
        .route("/api/resign-requests/:id/decision", post(decide_resign))
}
