//! In-memory batch repository.
//!
//! Same versioning rules as the SQLite store. Used by tests and by
//! `apiary serve --memory`.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::{
    domain::{BatchId, BatchInspection},
    repository::BatchRepository,
    Error, Result,
};

#[derive(Debug, Default)]
pub struct MemoryBatchRepository {
    batches: RwLock<HashMap<BatchId, BatchInspection>>,
}

impl MemoryBatchRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BatchRepository for MemoryBatchRepository {
    async fn insert(&self, batch: &BatchInspection) -> Result<BatchInspection> {
        let mut batches = self.batches.write().await;
        if batches.contains_key(batch.id()) {
            return Err(Error::ConcurrentModification {
                batch: batch.id().clone(),
                expected: 0,
            });
        }

        let mut stored = batch.clone();
        stored.set_version(1);
        batches.insert(stored.id().clone(), stored.clone());
        Ok(stored)
    }

    async fn load(&self, id: &BatchId) -> Result<BatchInspection> {
        self.batches
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::BatchNotFound(id.clone()))
    }

    async fn save(&self, batch: &BatchInspection) -> Result<BatchInspection> {
        let mut batches = self.batches.write().await;
        let current = batches
            .get(batch.id())
            .ok_or_else(|| Error::BatchNotFound(batch.id().clone()))?;

        if current.version() != batch.version() {
            return Err(Error::ConcurrentModification {
                batch: batch.id().clone(),
                expected: batch.version(),
            });
        }

        let mut stored = batch.clone();
        stored.set_version(batch.version() + 1);
        batches.insert(stored.id().clone(), stored.clone());
        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<BatchInspection>> {
        let mut all: Vec<BatchInspection> = self.batches.read().await.values().cloned().collect();
        all.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(all)
    }
}
