//! Ratecard API - HTTP server
//!
//! Upload pages replace the rate tables from spreadsheets, download pages
//! render the derived ratecards, and `/data` edits stored ratesheet records
//! one field at a time. Failures come back as flash messages on redirects.
//!
//! Author: hephaex@gmail.com

pub mod error;
pub mod flash;
pub mod handlers;
pub mod pages;
pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, response::Redirect, routing::get, Router};
use state::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_upload = state.config.server.max_upload_bytes;

    Router::new()
        .route("/", get(|| async { Redirect::to("/upload") }))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .merge(routes::ratesheet_routes())
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router over an empty in-memory store
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    create_router(Arc::new(AppState::default()))
}
