use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::AppState;

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub timestamp: String,
    pub store: ComponentStatus,
    pub store_latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Pings the order store; 503 when it is unreachable.
#[utoipa::path(
    get,
    path = "/health",
    summary = "Health check",
    responses(
        (status = 200, description = "Service and order store are up", body = HealthResponse),
        (status = 503, description = "Order store is unreachable", body = HealthResponse),
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();
    let result = state.store.ping().await;
    let store_latency_ms = started.elapsed().as_millis() as u64;

    let (code, store, message) = match result {
        Ok(()) => (StatusCode::OK, ComponentStatus::Up, None),
        Err(error) => {
            tracing::warn!(%error, "order store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ComponentStatus::Down,
                Some(error.response_message()),
            )
        }
    };

    (
        code,
        Json(HealthResponse {
            status: store,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            store,
            store_latency_ms,
            message,
        }),
    )
}
