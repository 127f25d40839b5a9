//! # anchor-api: HTTP Service for the Evidence Anchor
//!
//! Accepts anchoring requests from the evidence-processing pipeline,
//! records every attempt in the audit trail, and submits accepted hash
//! pairs to the ledger contract.
//!
//! ## API Surface
//!
//! | Path                         | Module                    | Purpose |
//! |------------------------------|---------------------------|---------|
//! | `POST /validate`             | [`routes::anchoring`]     | Anchor a hash pair under a caller id |
//! | `POST /relay/anchor`         | [`routes::anchoring`]     | Public relay, generated id, rate-limited |
//! | `GET /v1/audit/*`            | [`routes::audit`]         | Audit trail queries |
//! | `GET /health`                | [`routes::health`]        | Wallet / readiness report |
//! | `GET /health/liveness`       | [`routes::health`]        | Liveness probe |
//! | `GET /health/readiness`      | [`routes::health`]        | Readiness probe |
//! | `GET /metrics`               | [`routes::health`]        | Prometheus scrape |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → BodyLimit → [RateLimit, relay only] → Handler
//! ```

pub mod config;
pub mod error;
pub mod intake;
pub mod locks;
pub mod middleware;
pub mod relay;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let metrics_on = state.settings.metrics_enabled;

    // The relay is the only public-facing write path; it gets its own limiter.
    let relay = Router::new()
        .route("/relay/anchor", post(routes::anchoring::relay_anchor))
        .route_layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(Extension(state.relay_limiter.clone()));

    let mut router = Router::new()
        .merge(routes::anchoring::router())
        .merge(relay)
        .merge(routes::audit::router())
        .merge(routes::health::router());

    if metrics_on {
        router = router.route("/metrics", get(routes::health::prometheus_metrics));
    }

    let mut router = router.layer(DefaultBodyLimit::max(64 * 1024));

    if metrics_on {
        router = router
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(state.metrics.clone()));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
