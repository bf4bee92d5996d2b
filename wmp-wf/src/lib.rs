//! wmp-wf library - multi-entity workflow engine
//!
//! Moves missed-pickup reports, manhole reports, reward conversions,
//! area-service requests and resign requests through their lifecycles.
//! Every transition commits together with the notifications it causes.

use axum::Router;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod classifier;
pub mod error;
pub mod gateway;
pub mod images;
pub mod machines;
pub mod notify;
pub mod workflow;

pub use workflow::{WorkflowSettings, Workflows};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub workflows: Workflows,
}

impl AppState {
    pub fn new(workflows: Workflows) -> Self {
        Self { workflows }
    }
}

/// Build application router
///
/// `/health` needs no actor headers; every `/api` route except
/// `/api/buildinfo` does.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::missed_pickups::missed_pickup_routes())
        .merge(api::manholes::manhole_routes())
        .merge(api::conversions::conversion_routes())
        .merge(api::area_services::area_service_routes())
        .merge(api::resign::resign_routes())
        .merge(api::notifications::notification_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
