//! End-to-end batch walks through the engine.
//!
//! Covers the canonical walks (start, skip, inspect to completion, cancel,
//! reorder before start) plus the lifecycle error paths.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

mod common;

use apiary_core::{
    BatchEvent, BatchId, BatchStatus, Error, InspectionSubmission, SlotStatus,
};
use common::{current_id, hive, hives, memory_engine, names, started_batch};
use serde_json::json;

fn submission() -> InspectionSubmission {
    InspectionSubmission {
        inspected_on: None,
        payload: json!({ "temperament": "calm", "broodFrames": 6 }),
    }
}

// =============================================================================
// CANONICAL WALKS
// =============================================================================

#[tokio::test]
async fn start_makes_first_hive_current() {
    let (engine, _) = memory_engine();
    let batch = engine
        .create_batch(hives(&["H1", "H2", "H3"]))
        .await
        .expect("create");
    assert_eq!(batch.status(), BatchStatus::Draft);

    let outcome = engine.start(batch.id()).await.expect("start");
    assert_eq!(outcome.batch.status(), BatchStatus::InProgress);
    assert!(outcome.batch.started_at().is_some());
    assert_eq!(
        outcome.current().map(|s| s.hive_id.as_str()),
        Some("H1")
    );
}

#[tokio::test]
async fn skip_requeues_current_to_the_end() {
    let (engine, _) = memory_engine();
    let batch = started_batch(&engine, &["H1", "H2", "H3"]).await;

    let outcome = engine.skip_current(&batch).await.expect("skip");
    assert_eq!(
        names(&outcome.batch.order().traversal_ids()),
        vec!["H2", "H3", "H1"]
    );
    assert_eq!(current_id(&engine, &batch).await.as_deref(), Some("H2"));

    let h1 = outcome.batch.order().get(&hive("H1")).expect("H1 slot");
    assert_eq!(h1.status, SlotStatus::Pending);
}

#[tokio::test]
async fn inspecting_every_hive_completes_the_batch() {
    let (engine, log) = memory_engine();
    let batch = started_batch(&engine, &["H1", "H2", "H3"]).await;

    let first = engine
        .inspect_and_advance(&batch, submission())
        .await
        .expect("inspect H1");
    let h1 = first.batch.order().get(&hive("H1")).expect("H1 slot");
    assert_eq!(h1.status, SlotStatus::Completed);
    assert_eq!(h1.inspection_id.as_ref(), Some(&first.completed_inspection_id));
    assert_eq!(first.next.map(|s| s.hive_id), Some(hive("H2")));

    engine
        .inspect_and_advance(&batch, submission())
        .await
        .expect("inspect H2");
    let last = engine
        .inspect_and_advance(&batch, submission())
        .await
        .expect("inspect H3");

    assert!(last.next.is_none());
    assert_eq!(last.batch.status(), BatchStatus::Completed);
    assert!(last.batch.completed_at().is_some());
    assert!(matches!(last.events.last(), Some(BatchEvent::Completed { .. })));

    let records = log.records().await;
    assert_eq!(records.len(), 3);
    assert_eq!(
        records.iter().map(|r| r.hive_id.as_str()).collect::<Vec<_>>(),
        vec!["H1", "H2", "H3"]
    );
}

#[tokio::test]
async fn cancel_closes_the_gap_and_keeps_current() {
    let (engine, _) = memory_engine();
    let batch = started_batch(&engine, &["H1", "H2", "H3"]).await;

    let outcome = engine.cancel_hive(&batch, hive("H2")).await.expect("cancel");
    let order = outcome.batch.order();

    assert_eq!(names(&order.traversal_ids()), vec!["H1", "H3"]);
    assert_eq!(order.get(&hive("H1")).and_then(|s| s.position), Some(0));
    assert_eq!(order.get(&hive("H3")).and_then(|s| s.position), Some(1));
    assert_eq!(
        order.get(&hive("H2")).map(|s| s.status),
        Some(SlotStatus::Cancelled)
    );
    assert_eq!(current_id(&engine, &batch).await.as_deref(), Some("H1"));
}

#[tokio::test]
async fn reorder_before_start_sets_first_hive() {
    let (engine, _) = memory_engine();
    let batch = engine
        .create_batch(hives(&["H1", "H2", "H3"]))
        .await
        .expect("create");

    let outcome = engine
        .reorder_hives(batch.id(), hives(&["H3", "H1", "H2"]))
        .await
        .expect("reorder");
    let order = outcome.batch.order();
    assert_eq!(order.get(&hive("H3")).and_then(|s| s.position), Some(0));
    assert_eq!(order.get(&hive("H1")).and_then(|s| s.position), Some(1));
    assert_eq!(order.get(&hive("H2")).and_then(|s| s.position), Some(2));

    engine.start(batch.id()).await.expect("start");
    assert_eq!(current_id(&engine, batch.id()).await.as_deref(), Some("H3"));
}

// =============================================================================
// COMPLETION HOOK
// =============================================================================

#[tokio::test]
async fn cancelling_the_last_pending_hive_completes_the_batch() {
    let (engine, _) = memory_engine();
    let batch = started_batch(&engine, &["H1", "H2"]).await;

    engine
        .inspect_and_advance(&batch, submission())
        .await
        .expect("inspect H1");
    let outcome = engine.cancel_hive(&batch, hive("H2")).await.expect("cancel");

    assert!(outcome.completed_batch());
    assert_eq!(outcome.batch.status(), BatchStatus::Completed);
    assert!(outcome.current().is_none());
}

#[tokio::test]
async fn draft_batch_with_everything_cancelled_cannot_start() {
    let (engine, _) = memory_engine();
    let batch = engine.create_batch(hives(&["H1"])).await.expect("create");
    let outcome = engine.cancel_hive(batch.id(), hive("H1")).await.expect("cancel");
    assert_eq!(outcome.batch.status(), BatchStatus::Draft);

    let result = engine.start(batch.id()).await;
    assert!(matches!(result, Err(Error::EmptyBatch)));
}

// =============================================================================
// ERROR PATHS
// =============================================================================

#[tokio::test]
async fn operations_on_unknown_batch_fail() {
    let (engine, _) = memory_engine();
    let missing = BatchId::generate();

    assert!(matches!(
        engine.start(&missing).await,
        Err(Error::BatchNotFound(_))
    ));
    assert!(matches!(
        engine.current(&missing).await,
        Err(Error::BatchNotFound(_))
    ));
}

#[tokio::test]
async fn lifecycle_violations_are_rejected() {
    let (engine, _) = memory_engine();
    let draft = engine.create_batch(hives(&["H1"])).await.expect("create");

    assert!(matches!(
        engine.skip_current(draft.id()).await,
        Err(Error::BatchNotInProgress(BatchStatus::Draft))
    ));
    assert!(matches!(
        engine.inspect_and_advance(draft.id(), submission()).await,
        Err(Error::BatchNotInProgress(BatchStatus::Draft))
    ));

    engine.start(draft.id()).await.expect("start");
    assert!(matches!(
        engine.start(draft.id()).await,
        Err(Error::BatchAlreadyStarted(BatchStatus::InProgress))
    ));

    engine
        .inspect_and_advance(draft.id(), submission())
        .await
        .expect("inspect");
    assert!(matches!(
        engine.inspect_and_advance(draft.id(), submission()).await,
        Err(Error::BatchNotInProgress(BatchStatus::Completed))
    ));
    assert!(matches!(
        engine.reorder_hives(draft.id(), hives(&["H1"])).await,
        Err(Error::BatchCompleted)
    ));
}

#[tokio::test]
async fn cancel_errors_name_the_hive() {
    let (engine, _) = memory_engine();
    let batch = started_batch(&engine, &["H1", "H2"]).await;

    engine
        .inspect_and_advance(&batch, submission())
        .await
        .expect("inspect H1");

    assert!(matches!(
        engine.cancel_hive(&batch, hive("H1")).await,
        Err(Error::SlotAlreadyCompleted(h)) if h == hive("H1")
    ));
    assert!(matches!(
        engine.cancel_hive(&batch, hive("H9")).await,
        Err(Error::SlotNotFound(h)) if h == hive("H9")
    ));
}

#[tokio::test]
async fn duplicate_hives_are_rejected_at_creation() {
    let (engine, _) = memory_engine();
    let result = engine.create_batch(hives(&["H1", "H2", "H1"])).await;
    assert!(matches!(result, Err(Error::DuplicateHive(h)) if h == hive("H1")));
    assert!(engine.list_batches().await.expect("list").is_empty());
}

#[tokio::test]
async fn failed_mutation_does_not_bump_version() {
    let (engine, _) = memory_engine();
    let batch = started_batch(&engine, &["H1", "H2"]).await;
    let before = engine.get_batch(&batch).await.expect("load");

    let result = engine.reorder_hives(&batch, hives(&["H1"])).await;
    assert!(matches!(result, Err(Error::InvalidReorder(_))));

    let after = engine.get_batch(&batch).await.expect("load");
    assert_eq!(before, after);
}

// =============================================================================
// READS
// =============================================================================

#[tokio::test]
async fn current_is_idempotent_under_polling() {
    let (engine, _) = memory_engine();
    let batch = started_batch(&engine, &["H1", "H2"]).await;
    let version = engine.get_batch(&batch).await.expect("load").version();

    for _ in 0..5 {
        assert_eq!(current_id(&engine, &batch).await.as_deref(), Some("H1"));
    }
    assert_eq!(
        engine.get_batch(&batch).await.expect("load").version(),
        version
    );
}

#[tokio::test]
async fn describe_current_includes_name_and_progress() {
    let (engine, _) = memory_engine();
    let batch = started_batch(&engine, &["H1", "H2", "H3"]).await;
    engine
        .inspect_and_advance(&batch, submission())
        .await
        .expect("inspect H1");
    engine.cancel_hive(&batch, hive("H3")).await.expect("cancel H3");

    let described = engine.describe_current(&batch).await.expect("describe");
    assert_eq!(described.slot.map(|s| s.hive_id), Some(hive("H2")));
    assert_eq!(described.hive_name.as_deref(), Some("Orchard row"));
    assert_eq!(described.progress.total, 3);
    assert_eq!(described.progress.pending, 1);
    assert_eq!(described.progress.completed, 1);
    assert_eq!(described.progress.cancelled, 1);
}

#[tokio::test]
async fn list_returns_batches_oldest_first() {
    let (engine, _) = memory_engine();
    let first = engine.create_batch(hives(&["H1"])).await.expect("create");
    let second = engine.create_batch(hives(&["H2"])).await.expect("create");

    let listed = engine.list_batches().await.expect("list");
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().any(|b| b.id() == first.id()));
    assert!(listed.iter().any(|b| b.id() == second.id()));
    assert!(listed[0].created_at() <= listed[1].created_at());
}
