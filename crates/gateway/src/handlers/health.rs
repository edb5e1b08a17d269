//! Health check handlers

use axum::{extract::State, Json};
use docuchat_common::db::StoreHealth;
use serde::Serialize;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness probe - always returns ok if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe - pings the store if a connection exists, never opens one
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let start = std::time::Instant::now();

    let (status, db_check) = match state.services.store.health().await {
        StoreHealth::Up => (
            "ready",
            CheckResult {
                status: "up".to_string(),
                latency_ms: Some(start.elapsed().as_millis() as u64),
                error: None,
            },
        ),
        StoreHealth::NotConnected => (
            "not_connected",
            CheckResult {
                status: "not_connected".to_string(),
                latency_ms: None,
                error: None,
            },
        ),
        StoreHealth::Down(e) => (
            "not_ready",
            CheckResult {
                status: "down".to_string(),
                latency_ms: None,
                error: Some(e),
            },
        ),
    };

    Json(ReadyResponse {
        status: status.to_string(),
        checks: HealthChecks {
            database: db_check,
        },
    })
}
