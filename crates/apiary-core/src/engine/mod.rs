//! Batch engine: the transactional entry point for every batch operation.
//!
//! Each mutation runs as one unit:
//!
//! ```text
//! lock(batch) -> load -> validate + mutate + completion hook -> save(CAS) -> unlock
//! ```
//!
//! Reads skip the lock. Errors raised before `save` leave storage untouched.
//! `inspect_and_advance` additionally calls the inspection service between
//! validation and mutation; if that call fails nothing is saved, and if the
//! save fails afterwards the created inspection is discarded.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

mod locks;

use std::{sync::Arc, time::Duration};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use self::locks::{BatchGuard, BatchLocks};
use crate::{
    collaborators::{HiveDirectory, InspectionDraft, InspectionService},
    domain::{
        BatchCommand, BatchEvent, BatchId, BatchInspection, BatchStatus, HiveId, HiveSlot,
        InspectionId, Progress,
    },
    repository::BatchRepository,
    Error, Result,
};

/// Default upper bound on one inspection service call.
pub const DEFAULT_INSPECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunables for [`BatchEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub inspection_timeout: Duration,
    /// Queue mutations on the same batch behind an in-process lock.
    pub serialize_in_process: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            inspection_timeout: DEFAULT_INSPECTION_TIMEOUT,
            serialize_in_process: true,
        }
    }
}

/// Client input for `inspect_and_advance`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionSubmission {
    /// Defaults to today (UTC).
    #[serde(default)]
    pub inspected_on: Option<NaiveDate>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Result of a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub batch: BatchInspection,
    pub events: Vec<BatchEvent>,
}

impl MutationOutcome {
    /// Current hive after the mutation.
    #[must_use]
    pub fn current(&self) -> Option<&HiveSlot> {
        self.batch.current()
    }

    /// True if this mutation finished the batch.
    #[must_use]
    pub fn completed_batch(&self) -> bool {
        self.events.iter().any(BatchEvent::is_completion)
    }
}

/// Result of `inspect_and_advance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectOutcome {
    pub completed_inspection_id: InspectionId,
    pub next: Option<HiveSlot>,
    pub batch: BatchInspection,
    pub events: Vec<BatchEvent>,
}

/// The current hive with enough context to show it to a beekeeper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentHive {
    pub batch_id: BatchId,
    pub status: BatchStatus,
    pub slot: Option<HiveSlot>,
    pub hive_name: Option<String>,
    pub progress: Progress,
}

/// Orchestrates batch operations over the repository and collaborators.
#[derive(Clone)]
pub struct BatchEngine {
    repository: Arc<dyn BatchRepository>,
    inspections: Arc<dyn InspectionService>,
    hives: Arc<dyn HiveDirectory>,
    locks: BatchLocks,
    settings: EngineSettings,
}

impl std::fmt::Debug for BatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchEngine")
            .field("locks", &self.locks)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl BatchEngine {
    #[must_use]
    pub fn new(
        repository: Arc<dyn BatchRepository>,
        inspections: Arc<dyn InspectionService>,
        hives: Arc<dyn HiveDirectory>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            repository,
            inspections,
            hives,
            locks: BatchLocks::new(settings.serialize_in_process),
            settings,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // READS
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// # Errors
    ///
    /// Returns `BatchNotFound` for an unknown id.
    pub async fn get_batch(&self, id: &BatchId) -> Result<BatchInspection> {
        self.repository.load(id).await
    }

    /// # Errors
    ///
    /// Returns storage errors only.
    pub async fn list_batches(&self) -> Result<Vec<BatchInspection>> {
        self.repository.list().await
    }

    /// The current hive slot, recomputed from stored state. Safe to poll.
    ///
    /// # Errors
    ///
    /// Returns `BatchNotFound` for an unknown id.
    pub async fn current(&self, id: &BatchId) -> Result<Option<HiveSlot>> {
        Ok(self.repository.load(id).await?.current().cloned())
    }

    /// Current hive plus its display name and batch progress.
    ///
    /// # Errors
    ///
    /// Returns `BatchNotFound` for an unknown id.
    pub async fn describe_current(&self, id: &BatchId) -> Result<CurrentHive> {
        let batch = self.repository.load(id).await?;
        let slot = batch.current().cloned();
        let hive_name = slot
            .as_ref()
            .and_then(|slot| self.hives.display_name(&slot.hive_id));

        Ok(CurrentHive {
            batch_id: batch.id().clone(),
            status: batch.status(),
            slot,
            hive_name,
            progress: batch.progress(),
        })
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // MUTATIONS
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Create a draft batch over the given hives, in order.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateHive` if a hive is listed twice.
    pub async fn create_batch(&self, hives: Vec<HiveId>) -> Result<BatchInspection> {
        let batch = BatchInspection::draft(BatchId::generate(), hives, Utc::now())?;
        let batch = self.repository.insert(&batch).await?;
        info!(batch = %batch.id(), hives = batch.slots().len(), "Created batch");
        Ok(batch)
    }

    /// DRAFT -> IN_PROGRESS.
    ///
    /// # Errors
    ///
    /// Returns `BatchAlreadyStarted` or `EmptyBatch`.
    pub async fn start(&self, id: &BatchId) -> Result<MutationOutcome> {
        self.mutate(id, BatchCommand::Start).await
    }

    /// Requeue the current hive behind every other active hive.
    ///
    /// # Errors
    ///
    /// Returns `BatchNotInProgress` or `NoCurrentSlot`.
    pub async fn skip_current(&self, id: &BatchId) -> Result<MutationOutcome> {
        self.mutate(id, BatchCommand::SkipCurrent).await
    }

    /// Permanently remove a hive from the walk.
    ///
    /// # Errors
    ///
    /// Returns `BatchCompleted`, `SlotNotFound`, `SlotAlreadyCompleted` or
    /// `SlotAlreadyCancelled`.
    pub async fn cancel_hive(&self, id: &BatchId, hive: HiveId) -> Result<MutationOutcome> {
        self.mutate(id, BatchCommand::CancelHive(hive)).await
    }

    /// Replace the order of active hives.
    ///
    /// # Errors
    ///
    /// Returns `BatchCompleted` or `InvalidReorder`.
    pub async fn reorder_hives(&self, id: &BatchId, order: Vec<HiveId>) -> Result<MutationOutcome> {
        self.mutate(id, BatchCommand::Reorder(order)).await
    }

    /// Create an inspection for the current hive, mark it completed and
    /// advance to the next one.
    ///
    /// # Errors
    ///
    /// Returns `BatchNotInProgress` or `NoCurrentSlot` before calling out,
    /// `UpstreamInspectionCreationFailed` if the inspection service fails or
    /// times out, or a storage error if the save fails.
    pub async fn inspect_and_advance(
        &self,
        id: &BatchId,
        submission: InspectionSubmission,
    ) -> Result<InspectOutcome> {
        let _guard = self.locks.acquire(id).await;
        let mut batch = self.repository.load(id).await?;
        let hive = batch.inspection_target()?.clone();

        let draft = InspectionDraft {
            batch_id: id.clone(),
            hive_id: hive.clone(),
            inspected_on: submission
                .inspected_on
                .unwrap_or_else(|| Utc::now().date_naive()),
            payload: submission.payload,
        };
        let inspection = self.create_inspection(&draft).await?;

        let saved = match batch.apply(BatchCommand::CompleteCurrent(inspection.clone()), Utc::now())
        {
            Ok(events) => self
                .repository
                .save(&batch)
                .await
                .map(|batch| (batch, events)),
            Err(err) => Err(err),
        };

        let (batch, events) = match saved {
            Ok(saved) => saved,
            Err(err) => {
                self.discard_orphan(&inspection, &err).await;
                return Err(err);
            }
        };

        log_events(&batch, "inspect_and_advance", &events);
        let next = batch.current().cloned();
        info!(
            batch = %id,
            hive = %hive,
            inspection = %inspection,
            next = next.as_ref().map_or("none", |slot| slot.hive_id.as_str()),
            "Inspection recorded"
        );

        Ok(InspectOutcome {
            completed_inspection_id: inspection,
            next,
            batch,
            events,
        })
    }

    async fn mutate(&self, id: &BatchId, command: BatchCommand) -> Result<MutationOutcome> {
        let _guard = self.locks.acquire(id).await;
        let mut batch = self.repository.load(id).await?;

        let name = command.name();
        let events = batch.apply(command, Utc::now())?;
        let batch = self.repository.save(&batch).await?;

        log_events(&batch, name, &events);
        Ok(MutationOutcome { batch, events })
    }

    async fn create_inspection(&self, draft: &InspectionDraft) -> Result<InspectionId> {
        let timeout = self.settings.inspection_timeout;
        match tokio::time::timeout(timeout, self.inspections.create_inspection(draft)).await {
            Ok(Ok(id)) => Ok(id),
            Ok(Err(err)) => {
                warn!(batch = %draft.batch_id, hive = %draft.hive_id, error = %err, "Inspection service failed");
                Err(Error::UpstreamInspectionCreationFailed(err.to_string()))
            }
            Err(_) => {
                warn!(batch = %draft.batch_id, hive = %draft.hive_id, timeout = ?timeout, "Inspection service timed out");
                Err(Error::UpstreamInspectionCreationFailed(format!(
                    "timed out after {} ms",
                    timeout.as_millis()
                )))
            }
        }
    }

    async fn discard_orphan(&self, inspection: &InspectionId, cause: &Error) {
        warn!(inspection = %inspection, error = %cause, "Batch save failed, discarding inspection");
        if let Err(err) = self.inspections.discard(inspection).await {
            warn!(inspection = %inspection, error = %err, "Could not discard orphaned inspection");
        }
    }
}

fn log_events(batch: &BatchInspection, command: &str, events: &[BatchEvent]) {
    for event in events {
        debug!(batch = %batch.id(), event = event.name(), "{event}");
    }
    info!(
        batch = %batch.id(),
        command,
        status = %batch.status(),
        version = batch.version(),
        "Batch updated"
    );
    if events.iter().any(BatchEvent::is_completion) {
        info!(batch = %batch.id(), hives = batch.progress().completed, "Batch completed");
    }
}
