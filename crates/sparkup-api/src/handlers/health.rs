//! Health check handler.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::warn;

use crate::dto::response::HealthResponse;
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_ok = match state.stores.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            warn!(error = %e, "Store health check failed");
            false
        }
    };
    let stats = state.realtime.stats();

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if database_ok { "ok" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if database_ok { "connected" } else { "unavailable" }.to_string(),
            ws_connections: stats.connections,
            online_users: stats.users,
            realtime: stats.metrics,
        }),
    )
}
