//! Common test utilities for apiary-core integration tests

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_panics_doc
)]

use std::{collections::HashMap, sync::Arc, time::Duration};

use apiary_core::{
    store::{MemoryBatchRepository, MemoryInspectionLog},
    BatchEngine, BatchId, EngineSettings, HiveDirectory, HiveId, InspectionService,
    StaticHiveDirectory,
};

pub fn hive(id: &str) -> HiveId {
    HiveId::parse(id).expect("valid hive id")
}

pub fn hives(ids: &[&str]) -> Vec<HiveId> {
    ids.iter().map(|id| hive(id)).collect()
}

pub fn names(ids: &[HiveId]) -> Vec<String> {
    ids.iter().map(|id| id.as_str().to_string()).collect()
}

pub fn directory() -> Arc<dyn HiveDirectory> {
    let entries = HashMap::from([
        ("H1".to_string(), "North meadow".to_string()),
        ("H2".to_string(), "Orchard row".to_string()),
        ("H3".to_string(), "Creek side".to_string()),
    ]);
    Arc::new(StaticHiveDirectory::from_config(&entries))
}

/// Engine over in-memory storage, returning the inspection log for assertions.
pub fn memory_engine() -> (BatchEngine, Arc<MemoryInspectionLog>) {
    let log = Arc::new(MemoryInspectionLog::new());
    let engine = BatchEngine::new(
        Arc::new(MemoryBatchRepository::new()),
        log.clone(),
        directory(),
        EngineSettings::default(),
    );
    (engine, log)
}

/// Engine over in-memory storage with a custom inspection service.
pub fn engine_with_service(service: Arc<dyn InspectionService>, timeout: Duration) -> BatchEngine {
    BatchEngine::new(
        Arc::new(MemoryBatchRepository::new()),
        service,
        directory(),
        EngineSettings {
            inspection_timeout: timeout,
            serialize_in_process: true,
        },
    )
}

/// Create and start a batch over `ids`.
pub async fn started_batch(engine: &BatchEngine, ids: &[&str]) -> BatchId {
    let batch = engine.create_batch(hives(ids)).await.expect("create batch");
    engine.start(batch.id()).await.expect("start batch");
    batch.id().clone()
}

pub async fn current_id(engine: &BatchEngine, batch: &BatchId) -> Option<String> {
    engine
        .current(batch)
        .await
        .expect("current")
        .map(|slot| slot.hive_id.as_str().to_string())
}
