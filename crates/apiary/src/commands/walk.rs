//! Commands that move a batch through its walk.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use apiary_core::{InspectionSubmission, MutationOutcome};
use chrono::NaiveDate;

use super::{parse_batch_id, parse_hive_id, parse_hive_ids};
use crate::{
    context::AppContext,
    output::{self, BatchView, InspectView},
};

/// Where the inspection details come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadSource {
    Empty,
    Inline(String),
    File(PathBuf),
}

/// Inspect command options
#[derive(Debug, Clone)]
pub struct InspectOptions {
    pub batch: String,
    /// `YYYY-MM-DD`, today when absent
    pub date: Option<String>,
    pub payload: PayloadSource,
    pub json: bool,
}

/// Start a draft batch.
///
/// # Errors
///
/// Returns an error if the batch is missing, already started or empty
pub async fn start(ctx: &AppContext, batch: &str, json: bool) -> Result<()> {
    let id = parse_batch_id(batch)?;
    let outcome = ctx.engine.start(&id).await?;
    report(&outcome, json, |outcome| {
        format!(
            "Started batch {}. First hive: {}",
            outcome.batch.id(),
            output::render_slot(outcome.current())
        )
    })
}

/// Show the current hive.
///
/// # Errors
///
/// Returns an error if the batch is missing
pub async fn current(ctx: &AppContext, batch: &str, json: bool) -> Result<()> {
    let id = parse_batch_id(batch)?;
    let current = ctx.engine.describe_current(&id).await?;

    if json {
        output::print_json(&current)
    } else {
        println!("{}", output::render_current(&current));
        Ok(())
    }
}

/// Skip the current hive.
///
/// # Errors
///
/// Returns an error if the batch is not in progress
pub async fn skip(ctx: &AppContext, batch: &str, json: bool) -> Result<()> {
    let id = parse_batch_id(batch)?;
    let outcome = ctx.engine.skip_current(&id).await?;
    report(&outcome, json, |outcome| {
        format!("Skipped. Next hive: {}", output::render_slot(outcome.current()))
    })
}

/// Cancel one hive.
///
/// # Errors
///
/// Returns an error if the hive is not in the batch or already finished
pub async fn cancel(ctx: &AppContext, batch: &str, hive: &str, json: bool) -> Result<()> {
    let id = parse_batch_id(batch)?;
    let hive = parse_hive_id(hive)?;
    let outcome = ctx.engine.cancel_hive(&id, hive.clone()).await?;
    report(&outcome, json, |outcome| {
        let mut line = format!(
            "Cancelled hive {hive}. Current hive: {}",
            output::render_slot(outcome.current())
        );
        if outcome.completed_batch() {
            line.push_str("\nBatch completed.");
        }
        line
    })
}

/// Reorder the remaining hives.
///
/// # Errors
///
/// Returns an error if the order is not a permutation of the active hives
pub async fn reorder(ctx: &AppContext, batch: &str, hives: &[String], json: bool) -> Result<()> {
    let id = parse_batch_id(batch)?;
    let order = parse_hive_ids(hives)?;
    let outcome = ctx.engine.reorder_hives(&id, order).await?;
    report(&outcome, json, |outcome| output::render_batch(&outcome.batch))
}

/// Record an inspection for the current hive and advance.
///
/// # Errors
///
/// Returns an error if the date or payload do not parse, the batch has no
/// current hive, or the inspection cannot be recorded
pub async fn inspect(ctx: &AppContext, options: &InspectOptions) -> Result<()> {
    let id = parse_batch_id(&options.batch)?;
    let submission = InspectionSubmission {
        inspected_on: options.date.as_deref().map(parse_date).transpose()?,
        payload: load_payload(&options.payload).await?,
    };

    let outcome = ctx.engine.inspect_and_advance(&id, submission).await?;

    if options.json {
        return output::print_json(&InspectView::from(outcome));
    }

    println!("Recorded inspection {}", outcome.completed_inspection_id);
    match &outcome.next {
        Some(next) => println!("Next hive: {}", next.hive_id),
        None => println!("All hives done. Batch {} completed.", outcome.batch.id()),
    }
    println!("Progress: {}", output::render_progress(&outcome.batch.progress()));
    Ok(())
}

fn report(
    outcome: &MutationOutcome,
    json: bool,
    human: impl FnOnce(&MutationOutcome) -> String,
) -> Result<()> {
    if json {
        output::print_json(&BatchView::from(outcome.batch.clone()))
    } else {
        println!("{}", human(outcome).trim_end());
        Ok(())
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| apiary_core::Error::Parse(format!("invalid date '{raw}': {e}")).into())
}

async fn load_payload(source: &PayloadSource) -> Result<serde_json::Value> {
    let text = match source {
        PayloadSource::Empty => return Ok(serde_json::Value::Object(serde_json::Map::new())),
        PayloadSource::Inline(text) => text.clone(),
        PayloadSource::File(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read payload file {}", path.display()))?,
    };
    serde_json::from_str(&text).map_err(|e| apiary_core::Error::from(e).into())
}
