//! # Anchoring Endpoints
//!
//! - `POST /validate` with `{processingId, sourceHash, resultHash}`:
//!   `200 {status:"SUCCESS", txHash}` or `500 {status:"ERROR", message, code}`.
//! - `POST /relay/anchor` with `{input_hash, output_hash}`: derives a
//!   processing id (see [`crate::relay`]) and anchors under it. Validator
//!   failures are reported in-band as `200 {status:"FAILED", ...}`.
//!
//! Both endpoints count every outcome in `anchor_outcomes_total`.

use anchor_core::{AnchorError, ValidationError};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{AnchorFailure, AppError, FailureBody};
use crate::intake::Anchored;
use crate::middleware::metrics::Outcome;
use crate::relay::{random_salt, relay_processing_id, relay_timestamp};
use crate::state::AppState;

/// Body of `POST /validate`. Missing fields are treated as empty and
/// rejected by validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    #[serde(default)]
    pub processing_id: String,
    #[serde(default)]
    pub source_hash: String,
    #[serde(default)]
    pub result_hash: String,
}

/// Success body of `POST /validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    /// Always `"SUCCESS"`.
    pub status: String,
    /// The ledger transaction.
    pub tx_hash: String,
}

impl From<&Anchored> for ValidateResponse {
    fn from(anchored: &Anchored) -> Self {
        Self {
            status: "SUCCESS".to_string(),
            tx_hash: anchored.tx_hash.to_string(),
        }
    }
}

/// Body of `POST /relay/anchor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayRequest {
    pub input_hash: String,
    pub output_hash: String,
}

/// Response of `POST /relay/anchor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayResponse {
    /// `"SUCCESS"` or `"FAILED"`.
    pub status: String,
    /// The generated processing id.
    pub relay_processed_id: String,
    /// `"Blockchain Block Time"` or `"Local Time"`.
    pub timestamp_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_response: Option<ValidateResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_error: Option<FailureBody>,
}

/// Build the anchoring router (the relay is mounted separately in `app`
/// because it carries its own rate limit).
pub fn router() -> Router<AppState> {
    Router::new().route("/validate", post(validate))
}

async fn validate(
    State(state): State<AppState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<ValidateResponse>, AnchorFailure> {
    let Json(req) = payload.map_err(|rejection| {
        state.metrics.record_outcome(Outcome::Rejected);
        AnchorFailure(ValidationError::MalformedBody(rejection.body_text()).into())
    })?;

    let anchored = anchor(&state, &req.processing_id, &req.source_hash, &req.result_hash).await?;
    Ok(Json(ValidateResponse::from(&anchored)))
}

/// POST /relay/anchor
pub async fn relay_anchor(
    State(state): State<AppState>,
    payload: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Json<RelayResponse>, AppError> {
    let Json(req) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;

    let (timestamp, source) = relay_timestamp(state.rpc.as_deref()).await;
    let processing_id =
        relay_processing_id(&req.input_hash, &req.output_hash, timestamp, random_salt());
    tracing::info!(
        processing_id = %processing_id,
        timestamp,
        timestamp_source = source.label(),
        "relay id generated"
    );

    let result = anchor(&state, &processing_id, &req.input_hash, &req.output_hash).await;
    let response = match result {
        Ok(anchored) => RelayResponse {
            status: "SUCCESS".to_string(),
            relay_processed_id: processing_id,
            timestamp_source: source.label().to_string(),
            validator_response: Some(ValidateResponse::from(&anchored)),
            validator_error: None,
        },
        Err(err) => RelayResponse {
            status: "FAILED".to_string(),
            relay_processed_id: processing_id,
            timestamp_source: source.label().to_string(),
            validator_response: None,
            validator_error: Some(AnchorFailure(err).body()),
        },
    };
    Ok(Json(response))
}

/// Run one anchoring request to completion.
///
/// The lifecycle runs on its own task: if the caller disconnects and the
/// handler future is dropped, the lock, the ledger call and the terminal
/// status write still finish.
async fn anchor(
    state: &AppState,
    processing_id: &str,
    source_hash: &str,
    result_hash: &str,
) -> Result<Anchored, AnchorError> {
    let task_state = state.clone();
    let (processing_id, source_hash, result_hash) = (
        processing_id.to_string(),
        source_hash.to_string(),
        result_hash.to_string(),
    );
    let task = tokio::spawn(async move {
        let result = task_state
            .intake
            .handle(&processing_id, &source_hash, &result_hash)
            .await;
        record(&task_state, &processing_id, &result);
        result
    });

    task.await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "anchoring task did not complete");
        Err(AnchorError::Store(format!("anchoring task failed: {e}")))
    })
}

fn record(state: &AppState, processing_id: &str, result: &Result<Anchored, AnchorError>) {
    let outcome = match result {
        Ok(a) if a.duplicate => Outcome::Duplicate,
        Ok(_) => Outcome::Sent,
        Err(AnchorError::Validation(_) | AnchorError::Conflict(_)) => Outcome::Rejected,
        Err(_) => Outcome::Failed,
    };
    state.metrics.record_outcome(outcome);

    if let Err(err) = result {
        tracing::warn!(
            processing_id,
            code = err.kind(),
            error = %err,
            "anchoring request failed"
        );
    }
}
