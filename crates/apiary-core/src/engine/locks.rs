//! Per-batch mutual exclusion inside one process.
//!
//! Mutations on the same batch id queue behind each other; different batches
//! never contend. Cross-process safety comes from the repository's version
//! check, not from here.
//!
//! Locks are released automatically when the guard is dropped.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::BatchId;

/// Held for the duration of one mutation.
#[derive(Debug)]
#[must_use = "the batch is unlocked as soon as the guard is dropped"]
pub struct BatchGuard {
    _guard: Option<OwnedMutexGuard<()>>,
}

/// Keyed async mutex over batch ids.
#[derive(Debug, Clone)]
pub struct BatchLocks {
    enabled: bool,
    locks: Arc<Mutex<HashMap<BatchId, Arc<Mutex<()>>>>>,
}

impl Default for BatchLocks {
    fn default() -> Self {
        Self::new(true)
    }
}

impl BatchLocks {
    /// With `enabled == false`, `acquire` returns immediately and only the
    /// version check protects concurrent writers.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Wait until no other mutation holds `batch`.
    pub async fn acquire(&self, batch: &BatchId) -> BatchGuard {
        if !self.enabled {
            return BatchGuard { _guard: None };
        }

        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries only the map still references belong to finished mutations.
            locks.retain(|id, lock| id == batch || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(batch.clone()).or_default())
        };

        BatchGuard {
            _guard: Some(lock.lock_owned().await),
        }
    }

    /// Number of batch ids currently tracked.
    pub async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}
