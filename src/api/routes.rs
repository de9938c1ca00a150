//! Router construction

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::handlers;
use crate::AppState;

/// Build the HTTP router.
///
/// Cross-origin requests are allowed from any origin, with credentials.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/generate/", post(handlers::generate))
        .route("/generate", post(handlers::generate))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}
