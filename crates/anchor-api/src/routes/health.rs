//! Health probes and the Prometheus scrape endpoint.
//!
//! Readiness reflects only whether the signing identity is installed.
//! Database and ledger reachability are separate failure domains and are
//! not folded in.

use anchor_store::AuditLedger;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// `"ALIVE"` once the signing identity is ready, else `"STARTING"`.
    pub status: String,
    /// `"UNLOCKED"` or `"LOCKED"`.
    pub wallet: String,
    /// Audit store backend.
    pub db_type: String,
}

impl HealthReport {
    /// Report for a given readiness.
    pub fn for_readiness(ready: bool) -> Self {
        Self {
            status: if ready { "ALIVE" } else { "STARTING" }.to_string(),
            wallet: if ready { "UNLOCKED" } else { "LOCKED" }.to_string(),
            db_type: "sqlite".to_string(),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport::for_readiness(state.intake.is_ready()))
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 "ready" once the signing identity is installed.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.intake.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "signing identity locked")
    }
}

/// GET /metrics: Prometheus metrics scrape endpoint.
///
/// Refreshes the audit-rows gauge from the store, then encodes the registry.
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    refresh_audit_gauge(&state.metrics, state.ledger()).await;

    match state.metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

async fn refresh_audit_gauge(metrics: &ApiMetrics, ledger: &AuditLedger) {
    match ledger.count_by_status().await {
        Ok(counts) => {
            for (status, count) in counts {
                metrics.set_audit_records(status.as_str(), count);
            }
        }
        // Keep the last known values; the scrape still succeeds.
        Err(e) => tracing::warn!(error = %e, "audit row count unavailable for metrics"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_tracks_readiness() {
        let starting = HealthReport::for_readiness(false);
        assert_eq!(starting.status, "STARTING");
        assert_eq!(starting.wallet, "LOCKED");
        let alive = HealthReport::for_readiness(true);
        assert_eq!(alive.status, "ALIVE");
        assert_eq!(alive.wallet, "UNLOCKED");
        assert_eq!(alive.db_type, "sqlite");
    }
}
