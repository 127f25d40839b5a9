//! Shared application state passed to every handler.
//!
//! Built once at startup. Readiness is not a flag here: it is whether the
//! submitter's signer slot holds an identity.

use std::sync::Arc;

use anchor_chain::{ChainSubmitter, RpcClient};
use anchor_store::AuditLedger;

use crate::intake::IntakeService;
use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};

/// HTTP-surface settings.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Mount `/metrics` and record HTTP metrics.
    pub metrics_enabled: bool,
    /// Relay requests allowed per client per minute.
    pub relay_rate_limit_per_minute: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            relay_rate_limit_per_minute: 5,
        }
    }
}

/// Application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The anchoring lifecycle.
    pub intake: IntakeService,
    /// Ledger node used for relay block time. `None` means local time only.
    pub rpc: Option<Arc<RpcClient>>,
    /// Prometheus metrics.
    pub metrics: ApiMetrics,
    /// Relay rate limiter.
    pub relay_limiter: RateLimiter,
    /// HTTP-surface settings.
    pub settings: ApiSettings,
}

impl AppState {
    /// Assemble state from its collaborators.
    pub fn new(
        ledger: AuditLedger,
        submitter: Arc<ChainSubmitter>,
        rpc: Option<Arc<RpcClient>>,
        settings: ApiSettings,
    ) -> Self {
        Self {
            intake: IntakeService::new(ledger, submitter),
            rpc,
            metrics: ApiMetrics::new(),
            relay_limiter: RateLimiter::new(RateLimitConfig::per_minute(
                settings.relay_rate_limit_per_minute,
            )),
            settings,
        }
    }

    /// The audit store.
    pub fn ledger(&self) -> &AuditLedger {
        self.intake.ledger()
    }
}
