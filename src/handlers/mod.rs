//! HTTP handlers
//!
//! ## Routes
//!
//! - `GET /api/metadata?url=` - resolved metadata (JSON)
//! - `GET /api/raw?url=[&head_only=true]` - raw document (text)
//! - `GET /proxy?url=` - image pass-through
//! - `GET /health`, `GET /ready`, `GET /status` - probes and runtime metrics

pub mod inspect;
pub mod proxy;
pub mod status;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::cors::cors_layer;

pub use inspect::{metadata_handler, raw_handler, ApiError, ErrorBody, MetadataResponse};
pub use proxy::proxy_handler;
pub use status::{
    health_handler, readiness_handler, status_handler, AppState, HealthResponse,
    LatencyHistogram, StatusResponse,
};

/// Build the complete router.
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/metadata", get(metadata_handler))
        .route("/api/raw", get(raw_handler))
        .route("/proxy", get(proxy_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(readiness_handler))
        .route("/status", get(status_handler))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
