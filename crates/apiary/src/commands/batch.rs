//! Batch bookkeeping commands: create, list, show.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

use anyhow::Result;

use super::{parse_batch_id, parse_hive_ids};
use crate::{
    context::AppContext,
    output::{self, BatchView},
};

/// Create command options
#[derive(Debug, Clone)]
pub struct CreateOptions {
    /// Hives in walking order
    pub hives: Vec<String>,
    pub json: bool,
}

/// Create a draft batch.
///
/// # Errors
///
/// Returns an error if a hive id is invalid or listed twice, or storage fails
pub async fn create(ctx: &AppContext, options: &CreateOptions) -> Result<()> {
    let hives = parse_hive_ids(&options.hives)?;
    let batch = ctx.engine.create_batch(hives).await?;

    if options.json {
        output::print_json(&BatchView::from(batch))
    } else {
        println!("Created batch {}", batch.id());
        print!("{}", output::render_batch(&batch));
        println!();
        println!("Use 'apiary start {}' to begin the walk.", batch.id());
        Ok(())
    }
}

/// List every batch, oldest first.
///
/// # Errors
///
/// Returns an error if storage fails
pub async fn list(ctx: &AppContext, json: bool) -> Result<()> {
    let batches = ctx.engine.list_batches().await?;

    if json {
        let views: Vec<BatchView> = batches.into_iter().map(BatchView::from).collect();
        return output::print_json(&views);
    }

    if batches.is_empty() {
        println!("No batches yet.");
        println!("Use 'apiary create <hive>...' to plan one.");
    } else {
        batches
            .iter()
            .for_each(|batch| println!("{}", output::render_batch_line(batch)));
    }
    Ok(())
}

/// Show one batch with all of its slots.
///
/// # Errors
///
/// Returns an error if the batch does not exist or storage fails
pub async fn show(ctx: &AppContext, batch: &str, json: bool) -> Result<()> {
    let id = parse_batch_id(batch)?;
    let batch = ctx.engine.get_batch(&id).await?;

    if json {
        output::print_json(&BatchView::from(batch))
    } else {
        print!("{}", output::render_batch(&batch));
        Ok(())
    }
}
