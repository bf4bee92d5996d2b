//! Missed-pickup endpoints

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
pub struct CreateMissedPickupRequest {
    pub area_id: i64,
    /// Base64 photo of the uncollected waste
    pub image: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteMissedPickupRequest {
    /// Base64 after photo, required from the company
    pub image: Option<String>,
}

/// POST /api/missed-pickups
pub async fn create_missed_pickup(
    State(state): State<AppState>,
    Caller(actor): Caller,
    body: Result<Json<CreateMissedPickupRequest>, JsonRejection>,
) -> ApiResult<Json<ApiEnvelope>> {
    actor.require(Role::User)?;
    let Json(request) = body?;
    let image = ImageUpload::from_base64(&request.image)?;

    let report = state
        .workflows
        .create_missed_pickup(&actor, request.area_id, image)
        .await?;

    envelope("Missed pickup reported", &report)
}

/// POST /api/missed-pickups/:id/complete
///
/// The body is optional; users acknowledge without an image and any
/// image they send is ignored.
pub async fn complete_missed_pickup(
    State(state): State<AppState>,
    Caller(actor): Caller,
    path: Result<Path<i64>, PathRejection>,
    body: Option<Json<CompleteMissedPickupRequest>>,
) -> ApiResult<Json<ApiEnvelope>> {
    let Path(report_id) = path?;
    let request = body.map(|Json(request)| request).unwrap_or_default();
    // Only the company's after photo is classified
    let image = match actor.role {
        Role::Company => request
            .image
            .as_deref()
            .map(ImageUpload::from_base64)
            .transpose()?,
        Role::User | Role::Admin => None,
    };

    let report = state
        .workflows
        .acknowledge_missed_pickup(&actor, report_id, image)
        .await?;

    envelope("Completion recorded", &report)
}

pub fn missed_pickup_routes() -> Router<AppState> {
    Router::new()
        .route("/api/missed-pickups", post(create_missed_pickup))
        .route("/api/missed-pickups/:id/complete", post(complete_missed_pickup))
}
