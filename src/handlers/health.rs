use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::AppState;

const CHECK_KEY: &str = "health:check";

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
    Degraded,
}

/// Individual component health details
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthDetails {
    pub store: ComponentHealth,
    pub email: ComponentHealth,
}

/// Full health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub details: HealthDetails,
}

/// Tracks application start time for uptime calculation
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call this on application startup)
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn get_uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

/// Store reachability plus notification configuration.
///
/// An unconfigured email chain degrades the report but never fails it, since
/// notifications are best-effort.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let started = Instant::now();
    let store_result = state.store.get(CHECK_KEY).await;
    let latency = started.elapsed().as_millis() as u64;

    let store = ComponentHealth {
        status: if store_result.is_ok() {
            ComponentStatus::Up
        } else {
            ComponentStatus::Down
        },
        message: store_result.map_or_else(|e| format!("Store unavailable: {}", e), |_| {
            "Store reachable".to_string()
        }),
        latency_ms: Some(latency),
    };

    let chain = state.notifier.email_chain();
    let email = if chain.is_configured() {
        ComponentHealth {
            status: ComponentStatus::Up,
            message: format!("primary {}, fallback {}", chain.primary(), chain.fallback()),
            latency_ms: None,
        }
    } else {
        ComponentHealth {
            status: ComponentStatus::Degraded,
            message: "No email vendor configured".to_string(),
            latency_ms: None,
        }
    };

    let overall = match (store.status, email.status) {
        (ComponentStatus::Down, _) => ComponentStatus::Down,
        (_, ComponentStatus::Up) => ComponentStatus::Up,
        _ => ComponentStatus::Degraded,
    };
    let code = if overall == ComponentStatus::Down {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        code,
        Json(HealthResponse {
            status: overall,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_secs: get_uptime_secs(),
            details: HealthDetails { store, email },
        }),
    )
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
