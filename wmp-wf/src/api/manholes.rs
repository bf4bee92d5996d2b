//! Manhole report endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use wmp_common::api::{ApiEnvelope, Role};

use super::{envelope, Caller};
use crate::error::ApiResult;
use crate::images::ImageUpload;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateManholeRequest {
    pub area_id: i64,
    /// One of `lost`, `open`, `hidden`, `damaged`
    pub report_type: String,
    pub image: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignManholeRequest {
    pub company_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ResolveManholeRequest {
    pub image: String,
}

/// POST /api/manholes
pub async fn create_manhole_report(
    State(state): State<AppState>,
    Caller(actor): Caller,
    body: Result<Json<CreateManholeRequest>, JsonRejection>,
) -> ApiResult<Json<ApiEnvelope>> {
    actor.require(Role::User)?;
    let Json(request) = body?;
    let image = ImageUpload::from_base64(&request.image)?;

    let report = state
        .workflows
        .create_manhole_report(&actor, request.area_id, &request.report_type, image)
        .await?;

    envelope("Manhole report created", &report)
}

/// POST /api/manholes/:id/assign
pub async fn assign_manhole_report(
    State(state): State<AppState>,
    Caller(actor): Caller,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<AssignManholeRequest>, JsonRejection>,
) -> ApiResult<Json<ApiEnvelope>> {
    let Path(report_id) = path?;
    let Json(request) = body?;

    let report = state
        .workflows
        .assign_manhole_report(&actor, report_id, request.company_id)
        .await?;

    envelope("Manhole report assigned", &report)
}

/// POST /api/manholes/:id/resolve
pub async fn resolve_manhole_report(
    State(state): State<AppState>,
    Caller(actor): Caller,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<ResolveManholeRequest>, JsonRejection>,
) -> ApiResult<Json<ApiEnvelope>> {
    let Path(report_id) = path?;
    actor.require(Role::Company)?;
    let Json(request) = body?;
    let image = ImageUpload::from_base64(&request.image)?;

    let report = state
        .workflows
        .resolve_manhole_report(&actor, report_id, image)
        .await?;

    envelope("Manhole report resolved", &report)
}

/// POST /api/manholes/:id/confirm
pub async fn confirm_manhole_report(
    State(state): State<AppState>,
    Caller(actor): Caller,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiEnvelope>> {
    let Path(report_id) = path?;
    let report = state.workflows.confirm_manhole_report(&actor, report_id).await?;
    envelope("Resolution confirmed", &report)
}

/// POST /api/manholes/:id/reject
pub async fn reject_manhole_resolution(
    State(state): State<AppState>,
    Caller(actor): Caller,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiEnvelope>> {
    let Path(report_id) = path?;
    let report = state
        .workflows
        .reject_manhole_resolution(&actor, report_id)
        .await?;
    envelope("Resolution rejected", &report)
}

pub fn manhole_routes() -> Router<AppState> {
    Router::new()
        .route("/api/manholes", post(create_manhole_report))
        .route("/api/manholes/:id/assign", post(assign_manhole_report))
        .route("/api/manholes/:id/resolve", post(resolve_manhole_report))
        .route("/api/manholes/:id/confirm", post(confirm_manhole_report))
        .route("/api/manholes/:id/reject", post(reject_manhole_resolution))
}
