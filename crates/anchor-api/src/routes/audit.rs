//! # Audit Queries
//!
//! Operator read side of the audit trail.
//!
//! | Method | Path | Result |
//! |--------|------|--------|
//! | GET | `/v1/audit/{processing_id}` | the record, or 404 |
//! | GET | `/v1/audit?status=PENDING&limit=100` | records with a status, oldest first |
//!
//! `status` defaults to `PENDING` (crash-orphaned attempts awaiting
//! reconciliation). `limit` defaults to 100 and must be within 1..=1000.

use anchor_core::{AnchorStatus, AuditRecord, ProcessingId};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// Default page size.
pub const DEFAULT_LIMIT: u32 = 100;
/// Largest accepted page size.
pub const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub status: Option<String>,
    pub limit: Option<u32>,
}

/// Body of the list endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuditList {
    pub status: AnchorStatus,
    pub count: usize,
    pub records: Vec<AuditRecord>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/audit", get(list_records))
        .route("/v1/audit/{processing_id}", get(get_record))
}

async fn get_record(
    State(state): State<AppState>,
    Path(processing_id): Path<String>,
) -> Result<Json<AuditRecord>, AppError> {
    let id = ProcessingId::new(processing_id)?;
    Ok(Json(state.ledger().get(&id).await?))
}

async fn list_records(
    State(state): State<AppState>,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> Result<Json<AuditList>, AppError> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;

    let status = match query.status.as_deref() {
        None => AnchorStatus::Pending,
        Some(raw) => raw.to_ascii_uppercase().parse::<AnchorStatus>()?,
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_LIMIT}, got {limit}"
        )));
    }

    let records = state.ledger().list_by_status(status, limit).await?;
    Ok(Json(AuditList {
        status,
        count: records.len(),
        records,
    }))
}
