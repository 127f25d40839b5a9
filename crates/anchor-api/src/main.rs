//! # anchor-api: Binary Entry Point
//!
//! Startup order:
//!
//! 1. Read configuration; open the audit database and apply migrations.
//! 2. Log any `PENDING` rows left by an earlier crash.
//! 3. Start listening. Requests are accepted immediately; anchoring fails
//!    with "Blockchain not ready" until step 4 completes.
//! 4. Load the keystore and unlock the account on the node in the
//!    background. Failure here is fatal and stops the server.

use std::sync::Arc;

use anchor_api::config::{AppConfig, LogFormat};
use anchor_api::state::{ApiSettings, AppState};
use anchor_chain::{ChainSubmitter, IdentityError, NodeSigningIdentity, RpcClient, SignerSlot};
use anchor_core::{AnchorError, AnchorStatus};
use anchor_store::AuditLedger;
use std::future::IntoFuture;
use tracing_subscriber::EnvFilter;

/// How many orphaned ids to list in the startup report.
const ORPHAN_REPORT_LIMIT: u32 = 50;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(LogFormat::from_env());

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration error: {e}");
        AnchorError::from(e)
    })?;
    tracing::info!(?config, "configuration loaded");

    let ledger = AuditLedger::open(&config.store).await.map_err(|e| {
        tracing::error!("Audit database initialization failed: {e}");
        e
    })?;
    report_orphans(&ledger).await?;

    let rpc = Arc::new(RpcClient::new(config.rpc_url.clone(), config.submit_timeout)?);
    let signer = SignerSlot::new();
    let submitter = Arc::new(ChainSubmitter::new(
        signer.clone(),
        config.proxy_address.clone(),
        config.submit_timeout,
    ));

    let state = AppState::new(
        ledger,
        submitter,
        Some(rpc.clone()),
        ApiSettings {
            metrics_enabled: config.metrics_enabled,
            relay_rate_limit_per_minute: config.relay_rate_limit_per_minute,
        },
    );
    let app = anchor_api::app(state);

    let addr = std::net::SocketAddr::new(config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Evidence anchor listening on {addr}");

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .into_future();
    tokio::pin!(server);

    let unlock = async {
        let identity = NodeSigningIdentity::unlock(
            rpc,
            &config.keystore_path,
            &config.keystore_password,
            config.unlock_duration_secs,
        )
        .await?;
        signer.install(Arc::new(identity));
        Ok::<(), IdentityError>(())
    };

    tokio::select! {
        served = &mut server => {
            served?;
            return Ok(());
        }
        unlocked = unlock => {
            if let Err(e) = unlocked {
                tracing::error!("Fatal: signing identity unavailable: {e}");
                return Err(AnchorError::from(e).into());
            }
            tracing::info!("Signing identity ready; anchoring enabled");
        }
    }

    server.await?;
    tracing::info!("Evidence anchor stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn report_orphans(ledger: &AuditLedger) -> Result<(), anchor_store::StoreError> {
    let pending = ledger
        .count_by_status()
        .await?
        .into_iter()
        .find(|(status, _)| *status == AnchorStatus::Pending)
        .map_or(0, |(_, n)| n);
    if pending == 0 {
        return Ok(());
    }

    let ids: Vec<String> = ledger
        .list_by_status(AnchorStatus::Pending, ORPHAN_REPORT_LIMIT)
        .await?
        .into_iter()
        .map(|r| r.processing_id.to_string())
        .collect();
    tracing::warn!(
        pending,
        ids = ?ids,
        "PENDING audit records from an earlier run; ledger outcome unknown, reconcile manually"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
