//! Health check handlers
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use ratecard_core::Table;
use serde::Serialize;
use std::sync::Arc;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub build_info: BuildInfo,
}

#[derive(Serialize)]
pub struct BuildInfo {
    pub name: String,
    pub rust_version: String,
}

/// Liveness probe - basic health check
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_info: BuildInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            rust_version: "1.75+".to_string(),
        },
    })
}

/// Row counts of the stored tables
#[derive(Serialize, Default)]
pub struct TableCounts {
    pub ratesheet_v2: u64,
    pub country_v2: u64,
    pub template: u64,
    pub ratesheet_json: u64,
}

/// Readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub tables: Option<TableCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn table_counts(state: &AppState) -> ratecard_core::Result<TableCounts> {
    Ok(TableCounts {
        ratesheet_v2: state.store.count(Table::Rates).await?,
        country_v2: state.store.count(Table::Countries).await?,
        template: state.store.count(Table::Templates).await?,
        ratesheet_json: state.store.count(Table::RateBags).await?,
    })
}

/// Readiness probe - the store answers
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let counts = table_counts(&state).await;
    let ready = counts.is_ok();

    let response = ReadinessResponse {
        ready,
        uptime_seconds: state.uptime_secs(),
        total_requests: state.get_request_count(),
        error: counts.as_ref().err().map(ToString::to_string),
        tables: counts.ok(),
    };

    if ready {
        (StatusCode::OK, Json(response))
    } else {
        tracing::warn!(error = ?response.error, "Store not ready");
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
