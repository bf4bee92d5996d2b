//! Reward conversion endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use wmp_common::api::ApiEnvelope;

use super::{envelope, Caller};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateConversionRequest {
    pub points: i64,
}

/// GET /api/conversions
pub async fn list_conversions(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> ApiResult<Json<ApiEnvelope>> {
    let conversions = state.workflows.list_conversions(&actor).await?;
    envelope("Conversions retrieved", &conversions)
}

/// POST /api/conversions
pub async fn create_conversion(
    State(state): State<AppState>,
    Caller(actor): Caller,
    body: Result<Json<CreateConversionRequest>, JsonRejection>,
) -> ApiResult<Json<ApiEnvelope>> {
    let Json(request) = body?;
    let conversion = state.workflows.create_conversion(&actor, request.points).await?;
    envelope("Conversion requested", &conversion)
}

/// DELETE /api/conversions/:id
pub async fn cancel_conversion(
    State(state): State<AppState>,
    Caller(actor): Caller,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiEnvelope>> {
    let Path(conversion_id) = path?;
    state.workflows.cancel_conversion(&actor, conversion_id).await?;
    Ok(Json(ApiEnvelope::ok_empty("Conversion cancelled")))
}

/// POST /api/conversions/:id/seen
pub async fn mark_conversion_seen(
    State(state): State<AppState>,
    Caller(actor): Caller,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiEnvelope>> {
    let Path(conversion_id) = path?;
    let conversion = state
        .workflows
        .mark_conversion_seen(&actor, conversion_id)
        .await?;
    envelope("Conversion marked as seen", &conversion)
}

/// POST /api/conversions/:id/approve
pub async fn approve_conversion(
    State(state): State<AppState>,
    Caller(actor): Caller,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiEnvelope>> {
    let Path(conversion_id) = path?;
    let conversion = state
        .workflows
        .approve_conversion(&actor, conversion_id)
        .await?;
    envelope("Conversion approved", &conversion)
}

/// POST /api/conversions/:id/reject
pub async fn reject_conversion(
    State(state): State<AppState>,
    Caller(actor): Caller,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiEnvelope>> {
    let Path(conversion_id) = path?;
    let conversion = state
        .workflows
        .reject_conversion(&actor, conversion_id)
        .await?;
    envelope("Conversion rejected", &conversion)
}

pub fn conversion_routes() -> Router<AppState> {
    Router::new()
        .route("/api/conversions", get(list_conversions).post(create_conversion))
        .route("/api/conversions/:id", delete(cancel_conversion))
        .route("/api/conversions/:id/seen", post(mark_conversion_seen))
        .route("/api/conversions/:id/approve", post(approve_conversion))
        .route("/api/conversions/:id/reject", post(reject_conversion))
}
