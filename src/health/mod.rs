//! Liveness, readiness and version endpoints mounted under `/health`.

use crate::db::{check_connection, DbPool};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, Debug, Clone)]
pub struct ReadinessReport {
    pub status: HealthStatus,
    pub database: HealthStatus,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone)]
pub struct HealthState {
    pub db_pool: Arc<DbPool>,
    pub started: Instant,
}

impl HealthState {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            db_pool,
            started: Instant::now(),
        }
    }

    pub async fn readiness(&self) -> ReadinessReport {
        let database = match check_connection(&self.db_pool).await {
            Ok(()) => HealthStatus::Up,
            Err(err) => {
                error!(error = %err, "database health check failed");
                HealthStatus::Down
            }
        };
        ReadinessReport {
            status: database,
            database,
            uptime_seconds: self.started.elapsed().as_secs(),
            timestamp: Utc::now(),
        }
    }
}

/// Returns build and version information
pub async fn version_info() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// The process is up; no dependencies are checked.
pub async fn liveness_check() -> impl IntoResponse {
    debug!("liveness check");
    (
        StatusCode::OK,
        Json(json!({
            "status": HealthStatus::Up,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

/// 503 while the database is unreachable.
pub async fn readiness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let report = state.readiness().await;
    let status_code = match report.status {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(report))
}

pub fn health_routes(db_pool: Arc<DbPool>) -> Router {
    Router::new()
        .route("/", get(liveness_check))
        .route("/ready", get(readiness_check))
        .route("/version", get(version_info))
        .with_state(Arc::new(HealthState::new(db_pool)))
}
