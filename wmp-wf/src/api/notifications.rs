//! Notification inbox endpoints

use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use wmp_common::api::ApiEnvelope;

use super::{envelope, Caller};
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> ApiResult<Json<ApiEnvelope>> {
    let notifications = state.workflows.list_notifications(&actor).await?;
    envelope("Notifications retrieved", &notifications)
}

/// POST /api/notifications/:id/read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Caller(actor): Caller,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiEnvelope>> {
    let Path(notification_id) = path?;
    let notification = state
        .workflows
        .mark_notification_read(&actor, notification_id)
        .await?;
    envelope("Notification marked as read", &notification)
}

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/:id/read", post(mark_notification_read))
}
