//! Batch Repository Trait - persistence boundary for batch inspections.
//!
//! Implementations store a batch together with all of its slots as one unit
//! and guard writes with an optimistic version check:
//!
//! - `insert` stores a fresh batch at version 1
//! - `save` succeeds only if the stored version equals `batch.version()`,
//!   and writes `batch.version() + 1`
//!
//! A stale save fails with `ConcurrentModification` and leaves the stored
//! batch untouched.

use crate::{
    domain::{BatchId, BatchInspection},
    Result,
};

/// Storage for batch aggregates.
///
/// # Async Support
///
/// This trait uses `async_trait` for async method support.
#[async_trait::async_trait]
pub trait BatchRepository: Send + Sync {
    /// Store a new batch. Returns it with its first persisted version.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrentModification` if a batch with the same id exists.
    async fn insert(&self, batch: &BatchInspection) -> Result<BatchInspection>;

    /// Load a batch with all of its slots.
    ///
    /// # Errors
    ///
    /// Returns `BatchNotFound` for an unknown id, `CorruptState` if the
    /// stored rows violate an invariant.
    async fn load(&self, id: &BatchId) -> Result<BatchInspection>;

    /// Compare-and-swap save. Returns the batch with its new version.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrentModification` if another writer saved first,
    /// `BatchNotFound` if the batch was never inserted.
    async fn save(&self, batch: &BatchInspection) -> Result<BatchInspection>;

    /// All batches, oldest first.
    async fn list(&self) -> Result<Vec<BatchInspection>>;
}
