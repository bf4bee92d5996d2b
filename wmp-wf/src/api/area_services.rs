//! Area-service request endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use wmp_common::api::ApiEnvelope;
use wmp_common::db::ServiceType;

use super::{envelope, Caller};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AreaServiceRequestBody {
    pub area_id: i64,
    /// One of `waste_collection`, `manhole_management`, `recycling`
    pub service_type: String,
}

/// POST /api/area-services/requests
pub async fn request_area_service(
    State(state): State<AppState>,
    Caller(actor): Caller,
    body: Result<Json<AreaServiceRequestBody>, JsonRejection>,
) -> ApiResult<Json<ApiEnvelope>> {
    let Json(request) = body?;
    let service_type: ServiceType = request.service_type.parse()?;

    let created = state
        .workflows
        .request_area_service(&actor, request.area_id, service_type)
        .await?;

    envelope("Area service requested", &created)
}

/// POST /api/area-services/requests/:id/approve
pub async fn approve_area_service_request(
    State(state): State<AppState>,
    Caller(actor): Caller,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiEnvelope>> {
    let Path(request_id) = path?;
    let assignment = state
        .workflows
        .approve_area_service_request(&actor, request_id)
        .await?;
    envelope("Area service approved", &assignment)
}

/// DELETE /api/area-services/requests/:id
pub async fn withdraw_area_service_request(
    State(state): State<AppState>,
    Caller(actor): Caller,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiEnvelope>> {
    let Path(request_id) = path?;
    state
        .workflows
        .withdraw_area_service_request(&actor, request_id)
        .await?;
    Ok(Json(ApiEnvelope::ok_empty("Area service request withdrawn")))
}

pub fn area_service_routes() -> Router<AppState> {
    Router::new()
        .route("/api/area-services/requests", post(request_area_service))
        .route(
            "/api/area-services/requests/:id/approve",
            post(approve_area_service_request),
        )
        .route(
            "/api/area-services/requests/:id",
            delete(withdraw_area_service_request),
        )
}
