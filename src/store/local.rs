use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::Connection;
use uuid::Uuid;

use super::{ClearOutcome, QueueRepository, StoreError, TriageOutcome};
use crate::config::QUEUE_STORAGE_KEY;
use crate::db::{self, DatabaseError};
use crate::models::{PatientRecord, PatientStatus};
use crate::triage::{mock_esi, triage_summary, Intake};

/// Queue kept as one JSON array under a single key, classified locally.
pub struct LocalQueueStore {
    conn: Mutex<Connection>,
    key: String,
}

impl LocalQueueStore {
    /// Open (or create) the queue database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::with_connection(db::open_database(path)?))
    }

    /// In-memory store for tests and throwaway servers.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::with_connection(db::open_memory_database()?))
    }

    pub fn with_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            key: QUEUE_STORAGE_KEY.to_string(),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// A missing or unreadable blob reads as an empty queue.
    fn load(&self, conn: &Connection) -> Result<Vec<PatientRecord>, StoreError> {
        let Some(raw) = db::get_value(conn, &self.key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Queue blob unreadable, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, conn: &Connection, records: &[PatientRecord]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(records).map_err(DatabaseError::from)?;
        db::set_value(conn, &self.key, &raw)?;
        Ok(())
    }
}

#[async_trait]
impl QueueRepository for LocalQueueStore {
    async fn list(&self) -> Result<Vec<PatientRecord>, StoreError> {
        let conn = self.conn()?;
        self.load(&conn)
    }

    async fn append(&self, intake: &Intake) -> Result<TriageOutcome, StoreError> {
        let esi = mock_esi(&intake.complaint, Some(&intake.vitals));
        let analysis = triage_summary(intake);

        let record = PatientRecord {
            id: Uuid::new_v4().to_string(),
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            name: intake.name.clone(),
            age: intake.age.clone(),
            sex: intake.sex.clone(),
            vitals: intake.vitals,
            complaint: intake.complaint.clone(),
            esi,
            analysis: Some(analysis.clone()),
            status: PatientStatus::Active,
        };

        let conn = self.conn()?;
        let mut records = self.load(&conn)?;
        tracing::info!(id = %record.id, esi = esi.get(), "Patient added to local queue");
        records.push(record);
        self.save(&conn, &records)?;

        Ok(TriageOutcome {
            esi,
            analysis: Some(analysis),
        })
    }

    async fn resolve(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let mut records = self.load(&conn)?;

        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            tracing::debug!(id, "Resolve requested for unknown patient");
            return Ok(false);
        };
        if record.status == PatientStatus::Completed {
            return Ok(true);
        }
        record.status = PatientStatus::Completed;
        self.save(&conn, &records)?;
        tracing::info!(id, "Patient marked completed");
        Ok(true)
    }

    async fn clear(&self) -> Result<ClearOutcome, StoreError> {
        let conn = self.conn()?;
        self.save(&conn, &[])?;
        tracing::info!("Local queue cleared");
        Ok(ClearOutcome::Cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Vitals;

    fn intake(name: &str, complaint: &str) -> Intake {
        Intake {
            name: name.into(),
            age: "30".into(),
            sex: "M".into(),
            complaint: complaint.into(),
            vitals: Vitals::default(),
        }
    }

    #[tokio::test]
    async fn append_classifies_and_persists() {
        let store = LocalQueueStore::open_in_memory().unwrap();
        let outcome = store.append(&intake("Sam", "cardiac arrest")).await.unwrap();
        assert_eq!(outcome.esi.get(), 1);
        assert!(outcome.analysis.unwrap().contains("Sam"));

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, PatientStatus::Active);
        assert_eq!(records[0].time.len(), 8);
    }

    #[tokio::test]
    async fn resolve_is_idempotent() {
        let store = LocalQueueStore::open_in_memory().unwrap();
        store.append(&intake("Sam", "fever")).await.unwrap();
        let id = store.list().await.unwrap()[0].id.clone();

        assert!(store.resolve(&id).await.unwrap());
        assert!(store.resolve(&id).await.unwrap());
        assert_eq!(store.list().await.unwrap()[0].status, PatientStatus::Completed);
    }

    #[tokio::test]
    async fn resolve_unknown_id_is_false() {
        let store = LocalQueueStore::open_in_memory().unwrap();
        assert!(!store.resolve("missing").await.unwrap());
    }

    #[tokio::test]
    async fn clear_empties_queue() {
        let store = LocalQueueStore::open_in_memory().unwrap();
        store.append(&intake("A", "fever")).await.unwrap();
        store.append(&intake("B", "rash")).await.unwrap();
        assert_eq!(store.clear().await.unwrap(), ClearOutcome::Cleared);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_blob_reads_as_empty() {
        let store = LocalQueueStore::open_in_memory().unwrap();
        {
            let conn = store.conn().unwrap();
            db::set_value(&conn, QUEUE_STORAGE_KEY, "{not json").unwrap();
        }
        assert!(store.list().await.unwrap().is_empty());
        store.append(&intake("A", "fever")).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn queue_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("queue.db");
        {
            let store = LocalQueueStore::open(&path).unwrap();
            store.append(&intake("A", "vomiting")).await.unwrap();
        }
        let store = LocalQueueStore::open(&path).unwrap();
        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].esi.get(), 3);
    }
}
