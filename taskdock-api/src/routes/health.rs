/// Health check endpoints
///
/// # Endpoints
///
/// ```text
/// GET /         -> {"message": "...", "status": "WORKING"}
/// GET /health   -> {"status": "healthy", "version": "0.1.0", "database": "connected"}
/// ```
///
/// `/health` pings the primary store; a failed ping reports `degraded` with
/// status 200 so load balancers can tell "up but storage down" from "down".

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Root banner
#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    /// Application version
    pub version: String,

    /// `connected` or `disconnected`
    pub database: String,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "TaskDock API is running".to_string(),
        status: "WORKING".to_string(),
    })
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let primary = state.stores.primary();

    let connected = match primary.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, backend = primary.backend(), "health check ping failed");
            false
        }
    };

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
    })
}
