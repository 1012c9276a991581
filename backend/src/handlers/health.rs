//! Liveness and database reachability

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` when the ledger database answers, `degraded` otherwise
    pub status: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub database: &'static str,
    pub checked_at: DateTime<Utc>,
}

/// Round-trip a trivial query through the pool
async fn database_reachable(db: &PgPool) -> bool {
    sqlx::query("SELECT 1").execute(db).await.is_ok()
}

/// Always 200; database reachability is reported in the body
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let reachable = database_reachable(&state.db).await;
    if !reachable {
        tracing::warn!("Health check could not reach the database");
    }

    Json(HealthResponse {
        status: if reachable { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        database: if reachable { "connected" } else { "disconnected" },
        checked_at: Utc::now(),
    })
}
