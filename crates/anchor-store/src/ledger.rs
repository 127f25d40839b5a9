//! Audit ledger operations on the `audit_logs` table.

use std::path::PathBuf;
use std::time::Duration;

use anchor_core::{
    AnchorStatus, AuditRecord, EvidenceHash, EvidenceSubmission, ProcessingId, TxHash,
};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use crate::error::StoreError;

/// Connection settings for the audit ledger.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database file. Created if missing.
    pub path: PathBuf,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// How long an operation waits for a pooled connection.
    pub acquire_timeout: Duration,
    /// How long a writer waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl StoreConfig {
    /// Configuration with default pool bounds for the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: 8,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle to the durable audit trail. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct AuditLedger {
    pool: SqlitePool,
}

impl AuditLedger {
    /// Open (creating if needed) the audit database and apply migrations.
    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!(path = %config.path.display(), "audit ledger opened");

        Ok(Self { pool })
    }

    /// Insert a `PENDING` record.
    ///
    /// Returns `true` if the row was created and `false` if a record with the
    /// same processing id already existed, in which case nothing changed.
    pub async fn create_pending(&self, submission: &EvidenceSubmission) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO audit_logs (processing_id, source_hash, result_hash, status, created_at)
             VALUES (?, ?, ?, 'PENDING', ?)
             ON CONFLICT (processing_id) DO NOTHING",
        )
        .bind(submission.processing_id.as_str())
        .bind(submission.source_hash.as_str())
        .bind(submission.result_hash.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() == 1;
        tracing::debug!(
            processing_id = %submission.processing_id,
            created,
            "create_pending"
        );
        Ok(created)
    }

    /// Transition a `PENDING` record to `SENT`, recording the transaction.
    pub async fn mark_sent(&self, id: &ProcessingId, tx_hash: &TxHash) -> Result<(), StoreError> {
        self.transition(id, AnchorStatus::Sent, Some(tx_hash)).await
    }

    /// Transition a `PENDING` record to `FAILED`.
    pub async fn mark_failed(&self, id: &ProcessingId) -> Result<(), StoreError> {
        self.transition(id, AnchorStatus::Failed, None).await
    }

    /// Fetch a record, failing with [`StoreError::NotFound`] if absent.
    pub async fn get(&self, id: &ProcessingId) -> Result<AuditRecord, StoreError> {
        self.find(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Fetch a record if it exists.
    pub async fn find(&self, id: &ProcessingId) -> Result<Option<AuditRecord>, StoreError> {
        let row = sqlx::query_as::<_, AuditRow>(
            "SELECT processing_id, source_hash, result_hash, tx_hash, status, created_at
             FROM audit_logs WHERE processing_id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(AuditRow::into_record).transpose()
    }

    /// List records with the given status, oldest first.
    pub async fn list_by_status(
        &self,
        status: AnchorStatus,
        limit: u32,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT processing_id, source_hash, result_hash, tx_hash, status, created_at
             FROM audit_logs WHERE status = ? ORDER BY id ASC LIMIT ?",
        )
        .bind(status.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditRow::into_record).collect()
    }

    /// Number of records per status. Statuses with no rows report zero.
    pub async fn count_by_status(&self) -> Result<Vec<(AnchorStatus, i64)>, StoreError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM audit_logs GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts: Vec<(AnchorStatus, i64)> =
            AnchorStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for (status, count) in rows {
            let status: AnchorStatus = status.parse().map_err(|e| StoreError::CorruptRow {
                processing_id: "*".to_string(),
                reason: format!("{e}"),
            })?;
            if let Some(slot) = counts.iter_mut().find(|(s, _)| *s == status) {
                slot.1 = count;
            }
        }
        Ok(counts)
    }

    /// Apply a transition out of `PENDING`.
    ///
    /// The `status = 'PENDING'` guard makes the update a no-op on terminal
    /// rows; a follow-up read distinguishes "absent" from "already terminal".
    async fn transition(
        &self,
        id: &ProcessingId,
        to: AnchorStatus,
        tx_hash: Option<&TxHash>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE audit_logs SET status = ?, tx_hash = ?
             WHERE processing_id = ? AND status = 'PENDING'",
        )
        .bind(to.as_str())
        .bind(tx_hash.map(TxHash::as_str))
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            tracing::info!(
                processing_id = %id,
                status = %to,
                tx_hash = tx_hash.map(TxHash::as_str).unwrap_or("-"),
                "audit record transitioned"
            );
            return Ok(());
        }

        match self.find(id).await? {
            None => Err(StoreError::NotFound(id.to_string())),
            Some(existing) => Err(StoreError::AlreadyTerminal {
                processing_id: id.to_string(),
                status: existing.status,
            }),
        }
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct AuditRow {
    processing_id: String,
    source_hash: String,
    result_hash: String,
    tx_hash: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

impl AuditRow {
    fn into_record(self) -> Result<AuditRecord, StoreError> {
        let corrupt = |reason: String| StoreError::CorruptRow {
            processing_id: self.processing_id.clone(),
            reason,
        };

        let processing_id =
            ProcessingId::new(self.processing_id.clone()).map_err(|e| corrupt(e.to_string()))?;
        let source_hash = EvidenceHash::parse("source_hash", &self.source_hash)
            .map_err(|e| corrupt(e.to_string()))?;
        let result_hash = EvidenceHash::parse("result_hash", &self.result_hash)
            .map_err(|e| corrupt(e.to_string()))?;
        let tx_hash = self
            .tx_hash
            .clone()
            .map(TxHash::new)
            .transpose()
            .map_err(|e| corrupt(e.to_string()))?;
        let status: AnchorStatus = self.status.parse().map_err(|e| corrupt(format!("{e}")))?;

        if (status == AnchorStatus::Sent) != tx_hash.is_some() {
            return Err(corrupt(format!(
                "status {status} inconsistent with tx_hash presence"
            )));
        }

        Ok(AuditRecord {
            processing_id,
            source_hash,
            result_hash,
            tx_hash,
            status,
            created_at: self.created_at,
        })
    }
}
