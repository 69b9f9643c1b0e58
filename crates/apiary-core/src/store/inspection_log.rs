//! Local inspection service adapters.
//!
//! A deployment normally talks to a separate inspection service. These
//! adapters record inspections next to the batch data so the engine can run
//! standalone.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    collaborators::{InspectionDraft, InspectionService},
    domain::{BatchId, HiveId, InspectionId},
    Error, Result,
};

/// One stored inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRecord {
    pub id: InspectionId,
    pub batch_id: BatchId,
    pub hive_id: HiveId,
    pub inspected_on: NaiveDate,
    pub payload: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl InspectionRecord {
    fn from_draft(draft: &InspectionDraft) -> Self {
        Self {
            id: InspectionId::generate(),
            batch_id: draft.batch_id.clone(),
            hive_id: draft.hive_id.clone(),
            inspected_on: draft.inspected_on,
            payload: draft.payload.clone(),
            recorded_at: Utc::now(),
        }
    }
}

/// Inspection log kept in the batch database.
#[derive(Debug, Clone)]
pub struct SqliteInspectionLog {
    db: SqlitePool,
}

impl SqliteInspectionLog {
    #[must_use]
    pub const fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create the inspections table.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the statement fails.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS inspections (
                id TEXT PRIMARY KEY,
                batch_id TEXT NOT NULL,
                hive_id TEXT NOT NULL,
                inspected_on TEXT NOT NULL,
                payload TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            )",
        )
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Inspections recorded for one batch, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Database` on query failure, `CorruptState` or `Parse` on bad rows.
    pub async fn for_batch(&self, batch: &BatchId) -> Result<Vec<InspectionRecord>> {
        let rows: Vec<(String, String, String, String, String, String)> = sqlx::query_as(
            "SELECT id, batch_id, hive_id, inspected_on, payload, recorded_at
             FROM inspections WHERE batch_id = ? ORDER BY recorded_at, id",
        )
        .bind(batch.as_str())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|(id, batch_id, hive_id, inspected_on, payload, recorded_at)| {
                Ok(InspectionRecord {
                    id: InspectionId::parse(&id)?,
                    batch_id: BatchId::parse(&batch_id)?,
                    hive_id: HiveId::parse(&hive_id)?,
                    inspected_on: NaiveDate::parse_from_str(&inspected_on, "%Y-%m-%d").map_err(
                        |e| Error::CorruptState(format!("invalid date '{inspected_on}': {e}")),
                    )?,
                    payload: serde_json::from_str(&payload)?,
                    recorded_at: DateTime::parse_from_rfc3339(&recorded_at)
                        .map(|t| t.with_timezone(&Utc))
                        .map_err(|e| {
                            Error::CorruptState(format!("invalid timestamp '{recorded_at}': {e}"))
                        })?,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl InspectionService for SqliteInspectionLog {
    async fn create_inspection(&self, draft: &InspectionDraft) -> Result<InspectionId> {
        let record = InspectionRecord::from_draft(draft);
        let payload = serde_json::to_string(&record.payload)?;

        sqlx::query(
            "INSERT INTO inspections (id, batch_id, hive_id, inspected_on, payload, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.as_str())
        .bind(record.batch_id.as_str())
        .bind(record.hive_id.as_str())
        .bind(record.inspected_on.format("%Y-%m-%d").to_string())
        .bind(payload)
        .bind(record.recorded_at.to_rfc3339())
        .execute(&self.db)
        .await?;

        debug!(inspection = %record.id, hive = %record.hive_id, "Recorded inspection");
        Ok(record.id)
    }

    async fn discard(&self, id: &InspectionId) -> Result<()> {
        sqlx::query("DELETE FROM inspections WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

/// Inspection log held in memory.
#[derive(Debug, Default)]
pub struct MemoryInspectionLog {
    records: Mutex<Vec<InspectionRecord>>,
}

impl MemoryInspectionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored inspection.
    pub async fn records(&self) -> Vec<InspectionRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl InspectionService for MemoryInspectionLog {
    async fn create_inspection(&self, draft: &InspectionDraft) -> Result<InspectionId> {
        let record = InspectionRecord::from_draft(draft);
        let id = record.id.clone();
        self.records.lock().await.push(record);
        Ok(id)
    }

    async fn discard(&self, id: &InspectionId) -> Result<()> {
        self.records.lock().await.retain(|record| &record.id != id);
        Ok(())
    }
}
