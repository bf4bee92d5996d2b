//! HTTP API for wmp-wf
//!
//! Handlers translate JSON bodies into workflow calls and wrap results in
//! the shared response envelope.

pub mod actor;
pub mod area_services;
pub mod conversions;
pub mod health;
pub mod manholes;
pub mod missed_pickups;
pub mod notifications;
pub mod resign;

pub use actor::Caller;
pub use health::health_routes;

use axum::Json;
use serde::Serialize;
use wmp_common::api::ApiEnvelope;
use wmp_common::Error;

use crate::error::ApiResult;

/// Success envelope carrying `data`
pub(crate) fn envelope<T: Serialize>(message: &str, data: &T) -> ApiResult<Json<ApiEnvelope>> {
    let value = serde_json::to_value(data)
        .map_err(|e| Error::Internal(format!("Failed to serialize response: {}", e)))?;
    Ok(Json(ApiEnvelope::ok(message, value)))
}
