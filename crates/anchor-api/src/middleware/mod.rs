//! HTTP middleware: Prometheus metrics and per-client rate limiting.

pub mod metrics;
pub mod rate_limit;
