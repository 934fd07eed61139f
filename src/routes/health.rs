/**
 * Health Routes
 * Endpoints for checking backend health status
 */
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::state::AppState;
use crate::storage::StoreError;

// Track server start time for uptime calculation
lazy_static::lazy_static! {
    static ref SERVER_START: Instant = Instant::now();
}

/// Initialize the server start time
pub fn init_start_time() {
    lazy_static::initialize(&SERVER_START);
}

/// Single service check result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    pub status: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceCheck {
    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Ready check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    pub checks: ReadyChecks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadyChecks {
    pub database: ServiceCheck,
}

/// Simple health response
#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

fn service_check(backend: &str, result: Result<Duration, StoreError>) -> ServiceCheck {
    match result {
        Ok(duration) => ServiceCheck {
            status: "healthy".to_string(),
            backend: backend.to_string(),
            response_time: Some(duration.as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::warn!(backend, error = %e, "storage health check failed");
            ServiceCheck {
                status: "unhealthy".to_string(),
                backend: backend.to_string(),
                response_time: None,
                error: Some("Storage backend unavailable".to_string()),
            }
        }
    }
}

async fn check_store(state: &AppState) -> ServiceCheck {
    service_check(state.store.backend_tag(), state.store.health_check().await)
}

/// GET /health - Simple health ping
pub async fn health_ping() -> impl IntoResponse {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/database - Storage health check
pub async fn health_database(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(check_store(&state).await))
}

/// GET /health/ready - Readiness check, 503 while storage is unreachable
pub async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let database = check_store(&state).await;
    let is_ready = database.is_healthy();

    let response = ReadyResponse {
        status: if is_ready { "ready" } else { "not ready" }.to_string(),
        timestamp: Utc::now(),
        uptime: SERVER_START.elapsed().as_secs(),
        reason: (!is_ready).then(|| "Storage backend is not healthy".to_string()),
        checks: ReadyChecks { database },
    };

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
