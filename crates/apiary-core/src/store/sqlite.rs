//! SQLite batch repository.
//!
//! A batch is one row in `batch_inspections` plus one row per slot in
//! `hive_slots`. `slot_index` preserves insertion order; `position` is the
//! traversal order and is NULL for cancelled slots. Saves run in a single
//! transaction guarded by `WHERE id = ? AND version = ?`; loads read the
//! batch row and its slots in one transaction.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

use std::{path::Path, time::Duration};

use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Sqlite, SqlitePool, Transaction,
};
use tracing::debug;

use crate::{
    domain::{BatchId, BatchInspection, BatchRecord, HiveId, HiveSlot, InspectionId},
    repository::BatchRepository,
    Error, Result,
};

type BatchRow = (String, String, String, Option<String>, Option<String>, i64);
type SlotRow = (String, Option<i64>, String, Option<String>);

/// Batch storage backed by a `SQLite` pool.
#[derive(Debug, Clone)]
pub struct SqliteBatchRepository {
    db: SqlitePool,
}

impl SqliteBatchRepository {
    #[must_use]
    pub const fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Open (creating if needed) a database file and initialize the schema.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the parent directory cannot be created, `Database` if
    /// the connection or schema setup fails.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let db = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let repo = Self::new(db);
        repo.init().await?;
        debug!(path = %path.display(), "Opened batch database");
        Ok(repo)
    }

    /// Private in-memory database, mostly for tests.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the connection or schema setup fails.
    pub async fn in_memory() -> Result<Self> {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let repo = Self::new(db);
        repo.init().await?;
        Ok(repo)
    }

    /// Get the database pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Create the batch tables.
    ///
    /// # Errors
    ///
    /// Returns `Database` if a statement fails.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS batch_inspections (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT,
                version INTEGER NOT NULL
            )",
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS hive_slots (
                batch_id TEXT NOT NULL REFERENCES batch_inspections(id) ON DELETE CASCADE,
                slot_index INTEGER NOT NULL,
                hive_id TEXT NOT NULL,
                position INTEGER,
                status TEXT NOT NULL,
                inspection_id TEXT,
                PRIMARY KEY (batch_id, slot_index),
                UNIQUE (batch_id, hive_id)
            )",
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn insert_slots(
        tx: &mut Transaction<'_, Sqlite>,
        batch: &BatchId,
        slots: &[HiveSlot],
    ) -> Result<()> {
        for (index, slot) in (0_i64..).zip(slots) {
            sqlx::query(
                "INSERT INTO hive_slots (batch_id, slot_index, hive_id, position, status, inspection_id)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(batch.as_str())
            .bind(index)
            .bind(slot.hive_id.as_str())
            .bind(slot.position.map(i64::from))
            .bind(slot.status.as_str())
            .bind(slot.inspection_id.as_ref().map(InspectionId::as_str))
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Read a batch row and its slots inside `tx`, so both come from the
    /// same snapshot even while another connection is saving.
    async fn load_in(tx: &mut Transaction<'_, Sqlite>, id: &BatchId) -> Result<BatchInspection> {
        let row: Option<BatchRow> = sqlx::query_as(
            "SELECT id, status, created_at, started_at, completed_at, version
             FROM batch_inspections WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&mut **tx)
        .await?;
        let row = row.ok_or_else(|| Error::BatchNotFound(id.clone()))?;

        let rows: Vec<SlotRow> = sqlx::query_as(
            "SELECT hive_id, position, status, inspection_id
             FROM hive_slots WHERE batch_id = ? ORDER BY slot_index",
        )
        .bind(id.as_str())
        .fetch_all(&mut **tx)
        .await?;
        let slots = rows
            .into_iter()
            .map(slot_from_row)
            .collect::<Result<Vec<_>>>()?;

        BatchInspection::reconstruct(record_from_row(row, slots)?)
    }
}

#[async_trait::async_trait]
impl BatchRepository for SqliteBatchRepository {
    async fn insert(&self, batch: &BatchInspection) -> Result<BatchInspection> {
        let record = batch.to_record();
        let mut tx = self.db.begin().await?;

        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM batch_inspections WHERE id = ?")
                .bind(record.id.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(Error::ConcurrentModification {
                batch: record.id,
                expected: 0,
            });
        }

        sqlx::query(
            "INSERT INTO batch_inspections (id, status, created_at, started_at, completed_at, version)
             VALUES (?, ?, ?, ?, ?, 1)",
        )
        .bind(record.id.as_str())
        .bind(record.status.as_str())
        .bind(record.created_at.to_rfc3339())
        .bind(record.started_at.map(|t| t.to_rfc3339()))
        .bind(record.completed_at.map(|t| t.to_rfc3339()))
        .execute(&mut *tx)
        .await?;

        Self::insert_slots(&mut tx, &record.id, &record.slots).await?;
        tx.commit().await?;

        let mut stored = batch.clone();
        stored.set_version(1);
        Ok(stored)
    }

    async fn load(&self, id: &BatchId) -> Result<BatchInspection> {
        let mut tx = self.db.begin().await?;
        let batch = Self::load_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(batch)
    }

    async fn save(&self, batch: &BatchInspection) -> Result<BatchInspection> {
        let record = batch.to_record();
        let expected = to_db_version(record.version)?;
        let next = to_db_version(record.version + 1)?;
        let mut tx = self.db.begin().await?;

        let updated = sqlx::query(
            "UPDATE batch_inspections
             SET status = ?, started_at = ?, completed_at = ?, version = ?
             WHERE id = ? AND version = ?",
        )
        .bind(record.status.as_str())
        .bind(record.started_at.map(|t| t.to_rfc3339()))
        .bind(record.completed_at.map(|t| t.to_rfc3339()))
        .bind(next)
        .bind(record.id.as_str())
        .bind(expected)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let exists: Option<(i64,)> =
                sqlx::query_as("SELECT version FROM batch_inspections WHERE id = ?")
                    .bind(record.id.as_str())
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match exists {
                Some(_) => Error::ConcurrentModification {
                    batch: record.id,
                    expected: record.version,
                },
                None => Error::BatchNotFound(record.id),
            });
        }

        sqlx::query("DELETE FROM hive_slots WHERE batch_id = ?")
            .bind(record.id.as_str())
            .execute(&mut *tx)
            .await?;
        Self::insert_slots(&mut tx, &record.id, &record.slots).await?;
        tx.commit().await?;

        let mut stored = batch.clone();
        stored.set_version(record.version + 1);
        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<BatchInspection>> {
        let mut tx = self.db.begin().await?;
        let ids: Vec<(String,)> =
            sqlx::query_as("SELECT id FROM batch_inspections ORDER BY created_at, id")
                .fetch_all(&mut *tx)
                .await?;

        let mut batches = Vec::with_capacity(ids.len());
        for (id,) in ids {
            let id = BatchId::parse(&id)?;
            batches.push(Self::load_in(&mut tx, &id).await?);
        }
        tx.commit().await?;
        Ok(batches)
    }
}

fn to_db_version(version: u64) -> Result<i64> {
    i64::try_from(version)
        .map_err(|_| Error::CorruptState(format!("version {version} exceeds storage range")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::CorruptState(format!("invalid timestamp '{raw}': {e}")))
}

fn record_from_row(row: BatchRow, slots: Vec<HiveSlot>) -> Result<BatchRecord> {
    let (id, status, created_at, started_at, completed_at, version) = row;
    Ok(BatchRecord {
        id: BatchId::parse(&id)?,
        status: status.parse()?,
        slots,
        created_at: parse_timestamp(&created_at)?,
        started_at: started_at.as_deref().map(parse_timestamp).transpose()?,
        completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
        version: u64::try_from(version)
            .map_err(|_| Error::CorruptState(format!("negative version {version}")))?,
    })
}

fn slot_from_row(row: SlotRow) -> Result<HiveSlot> {
    let (hive_id, position, status, inspection_id) = row;
    Ok(HiveSlot {
        hive_id: HiveId::parse(&hive_id)?,
        position: position
            .map(|p| {
                u32::try_from(p)
                    .map_err(|_| Error::CorruptState(format!("invalid position {p} for '{hive_id}'")))
            })
            .transpose()?,
        status: status.parse()?,
        inspection_id: inspection_id.map(InspectionId::parse).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BatchCommand;

    fn hive(id: &str) -> HiveId {
        HiveId::parse(id).expect("valid hive id")
    }

    #[tokio::test]
    async fn test_roundtrip_preserves_slots() {
        let repo = SqliteBatchRepository::in_memory().await.expect("db");
        let mut batch = BatchInspection::draft(
            BatchId::generate(),
            [hive("H1"), hive("H2"), hive("H3")],
            Utc::now(),
        )
        .expect("batch");
        batch = repo.insert(&batch).await.expect("insert");

        batch
            .apply(BatchCommand::CancelHive(hive("H2")), Utc::now())
            .expect("cancel");
        batch.apply(BatchCommand::Start, Utc::now()).expect("start");
        batch
            .apply(BatchCommand::CompleteCurrent(InspectionId::generate()), Utc::now())
            .expect("complete");
        let saved = repo.save(&batch).await.expect("save");

        let loaded = repo.load(batch.id()).await.expect("load");
        assert_eq!(loaded, saved);
        assert_eq!(loaded.version(), 2);
        assert_eq!(loaded.current().map(|s| s.hive_id.as_str()), Some("H3"));
    }

    #[tokio::test]
    async fn test_save_of_unknown_batch_is_not_found() {
        let repo = SqliteBatchRepository::in_memory().await.expect("db");
        let batch =
            BatchInspection::draft(BatchId::generate(), [hive("H1")], Utc::now()).expect("batch");
        assert!(matches!(
            repo.save(&batch).await,
            Err(Error::BatchNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_rows_are_rejected() {
        let repo = SqliteBatchRepository::in_memory().await.expect("db");
        let batch = BatchInspection::draft(BatchId::generate(), [hive("H1"), hive("H2")], Utc::now())
            .expect("batch");
        repo.insert(&batch).await.expect("insert");

        sqlx::query("UPDATE hive_slots SET position = 5 WHERE hive_id = 'H2'")
            .execute(repo.pool())
            .await
            .expect("tamper");

        assert!(matches!(
            repo.load(batch.id()).await,
            Err(Error::CorruptState(_))
        ));
    }
}
