//! Liveness and readiness probes.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

use super::Endpoint;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::new("ok"))
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity. Returns 503 if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => (StatusCode::OK, Json(HealthResponse::new("ready"))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::new("unavailable")),
            )
        }
    }
}

pub fn endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::get("/health", health)
            .tag("Health")
            .summary("Liveness")
            .returns::<HealthResponse>(),
        Endpoint::get("/health/ready", readiness)
            .tag("Health")
            .summary("Readiness")
            .returns::<HealthResponse>(),
    ]
}
