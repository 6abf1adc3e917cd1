//! Queue repository: the one interface the kiosk and nurse views talk to.
//!
//! Two implementations exist, picked by configuration:
//! - [`LocalQueueStore`]: the whole queue as one JSON blob in SQLite,
//!   classified locally with the keyword classifier.
//! - [`RemoteQueueStore`]: the HTTP backend, which classifies server-side.

pub mod local;
pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{AppConfig, StoreKind};
use crate::db::DatabaseError;
use crate::models::{EsiLevel, PatientRecord, PatientStatus};
use crate::triage::Intake;

pub use local::LocalQueueStore;
pub use remote::RemoteQueueStore;

/// Message returned by stores that cannot bulk-clear.
pub const CLEAR_UNSUPPORTED_MESSAGE: &str =
    "Clearing the queue is not available for the remote backend.";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Cannot reach queue backend at {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Network error: backend returned HTTP {status}")]
    Status { status: u16 },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Internal lock error")]
    LockPoisoned,
}

/// Result of classifying and storing one intake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageOutcome {
    pub esi: EsiLevel,
    pub analysis: Option<String>,
}

/// What a `clear` call actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    Unsupported(&'static str),
}

/// Persist and retrieve patient records.
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Every record, in storage order.
    async fn list(&self) -> Result<Vec<PatientRecord>, StoreError>;

    /// Classify and store a validated intake.
    async fn append(&self, intake: &Intake) -> Result<TriageOutcome, StoreError>;

    /// Mark a record completed. `Ok(false)` when the id is unknown.
    /// Resolving an already completed record succeeds.
    async fn resolve(&self, id: &str) -> Result<bool, StoreError>;

    /// Remove every record, when the store supports it.
    async fn clear(&self) -> Result<ClearOutcome, StoreError>;
}

/// Dashboard ordering: active before completed, then most urgent first.
/// The sort is stable, so equal entries keep insertion order.
pub fn order_queue(mut records: Vec<PatientRecord>) -> Vec<PatientRecord> {
    records.sort_by_key(|r| (r.status == PatientStatus::Completed, r.esi));
    records
}

/// Open the repository selected by `config.store`.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn QueueRepository>, StoreError> {
    match config.store {
        StoreKind::Local => {
            let store = LocalQueueStore::open(&config.db_path)?;
            tracing::info!(path = %config.db_path.display(), "Using local queue store");
            Ok(Arc::new(store))
        }
        StoreKind::Remote => {
            let store = RemoteQueueStore::new(&config.api_url)?;
            tracing::info!(url = %config.api_url, "Using remote queue store");
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, esi: u8, status: PatientStatus) -> PatientRecord {
        PatientRecord {
            id: id.into(),
            time: "10:00:00".into(),
            name: id.into(),
            age: "40".into(),
            sex: String::new(),
            vitals: Default::default(),
            complaint: "x".into(),
            esi: EsiLevel::new(esi).unwrap(),
            analysis: None,
            status,
        }
    }

    #[test]
    fn orders_active_then_urgency_then_insertion() {
        let ordered = order_queue(vec![
            record("a", 3, PatientStatus::Active),
            record("b", 1, PatientStatus::Completed),
            record("c", 2, PatientStatus::Active),
            record("d", 3, PatientStatus::Active),
            record("e", 5, PatientStatus::Active),
        ]);
        let ids: Vec<&str> = ordered.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "d", "e", "b"]);
    }

    #[test]
    fn store_errors_read_as_network_errors() {
        let err = StoreError::Status { status: 502 };
        assert!(err.to_string().starts_with("Network error"));
    }
}
