//! Command functions against an on-disk SQLite state database.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::uninlined_format_args
)]

use std::path::Path;

use apiary::{
    cli::error::get_exit_code,
    commands::{
        batch::{self, CreateOptions},
        walk::{self, InspectOptions, PayloadSource},
    },
    context::{AppContext, Storage},
};
use apiary_core::{BatchStatus, Config};

async fn context(db: &Path) -> AppContext {
    let config = Config {
        state_db: db.display().to_string(),
        ..Config::default()
    };
    AppContext::open(config, Storage::Sqlite)
        .await
        .expect("sqlite context")
}

#[tokio::test]
async fn walk_persists_across_invocations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("state").join("apiary.db");

    let batch_id = {
        let ctx = context(&db).await;
        batch::create(
            &ctx,
            &CreateOptions {
                hives: vec!["H1".into(), "H2".into()],
                json: true,
            },
        )
        .await
        .expect("create");
        let batches = ctx.engine.list_batches().await.expect("list");
        assert_eq!(batches.len(), 1);
        batches[0].id().to_string()
    };

    let ctx = context(&db).await;
    walk::start(&ctx, &batch_id, false).await.expect("start");
    walk::skip(&ctx, &batch_id, false).await.expect("skip");
    walk::inspect(
        &ctx,
        &InspectOptions {
            batch: batch_id.clone(),
            date: Some("2024-05-17".into()),
            payload: PayloadSource::Inline(r#"{"queenSeen": true}"#.into()),
            json: false,
        },
    )
    .await
    .expect("inspect H2");

    let ctx = context(&db).await;
    walk::current(&ctx, &batch_id, true).await.expect("current");
    let batch = ctx
        .engine
        .list_batches()
        .await
        .expect("list")
        .pop()
        .expect("batch");
    assert_eq!(batch.status(), BatchStatus::InProgress);
    assert_eq!(batch.current().map(|s| s.hive_id.as_str()), Some("H1"));
    assert_eq!(batch.progress().completed, 1);

    walk::cancel(&ctx, &batch_id, "H1", false)
        .await
        .expect("cancel last hive");
    batch::show(&ctx, &batch_id, false).await.expect("show");
    let batch = ctx.engine.list_batches().await.expect("list").pop().expect("batch");
    assert_eq!(batch.status(), BatchStatus::Completed);
}

#[tokio::test]
async fn failures_map_to_exit_codes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(&dir.path().join("apiary.db")).await;

    let missing = walk::skip(&ctx, "no-such-batch", false)
        .await
        .expect_err("unknown batch");
    assert_eq!(get_exit_code(&missing), 3);

    let duplicate = batch::create(
        &ctx,
        &CreateOptions {
            hives: vec!["H1".into(), "H1".into()],
            json: false,
        },
    )
    .await
    .expect_err("duplicate hive");
    assert_eq!(get_exit_code(&duplicate), 1);

    batch::create(
        &ctx,
        &CreateOptions {
            hives: vec!["H1".into()],
            json: false,
        },
    )
    .await
    .expect("create");
    let id = ctx.engine.list_batches().await.expect("list")[0].id().to_string();
    let not_started = walk::inspect(
        &ctx,
        &InspectOptions {
            batch: id.clone(),
            date: None,
            payload: PayloadSource::Empty,
            json: false,
        },
    )
    .await
    .expect_err("draft batch");
    assert_eq!(get_exit_code(&not_started), 4);

    let bad_order = walk::reorder(&ctx, &id, &["H9".to_string()], false)
        .await
        .expect_err("unknown hive in order");
    assert_eq!(get_exit_code(&bad_order), 1);
}
