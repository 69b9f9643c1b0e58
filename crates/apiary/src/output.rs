//! Human and JSON rendering for command results.

use std::fmt::Write as _;

use anyhow::Result;
use apiary_core::{
    domain::Progress, BatchInspection, CurrentHive, HiveSlot, InspectOutcome, InspectionId,
    SlotStatus,
};
use serde::Serialize;

use crate::cli::error::{error_code, format_error};

/// A batch together with the values clients derive from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchView {
    #[serde(flatten)]
    pub batch: BatchInspection,
    pub current: Option<HiveSlot>,
    pub progress: Progress,
}

impl From<BatchInspection> for BatchView {
    fn from(batch: BatchInspection) -> Self {
        Self {
            current: batch.current().cloned(),
            progress: batch.progress(),
            batch,
        }
    }
}

/// Result of recording an inspection: what was created and where the walk
/// goes next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectView {
    pub inspection: InspectionId,
    pub next: Option<HiveSlot>,
    pub batch: BatchView,
}

impl From<InspectOutcome> for InspectView {
    fn from(outcome: InspectOutcome) -> Self {
        Self {
            inspection: outcome.completed_inspection_id,
            next: outcome.next,
            batch: BatchView::from(outcome.batch),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: String,
    exit_code: i32,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a failed command. JSON errors go to stdout so scripts can parse them.
pub fn print_error(json: bool, err: &anyhow::Error) {
    let message = format_error(err);
    if json {
        let body = ErrorBody {
            error: ErrorDetail {
                code: error_code(err),
                message,
                exit_code: crate::cli::error::get_exit_code(err),
            },
        };
        match serde_json::to_string_pretty(&body) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("Error: {err} (could not encode as JSON: {e})"),
        }
    } else {
        eprintln!("Error: {message}");
    }
}

#[must_use]
pub fn render_slot(slot: Option<&HiveSlot>) -> String {
    slot.map_or_else(
        || "none".to_string(),
        |slot| slot.hive_id.as_str().to_string(),
    )
}

#[must_use]
pub fn render_progress(progress: &Progress) -> String {
    format!(
        "{}/{} inspected, {} pending, {} cancelled",
        progress.completed,
        progress.total - progress.cancelled,
        progress.pending,
        progress.cancelled
    )
}

/// Multi-line description of a batch: header, progress, then slots in
/// walking order with cancelled hives last.
#[must_use]
pub fn render_batch(batch: &BatchInspection) -> String {
    let mut out = format!(
        "Batch {} ({}, v{})\n  Progress: {}\n",
        batch.id(),
        batch.status(),
        batch.version(),
        render_progress(&batch.progress())
    );

    let current = batch.current().map(|slot| slot.hive_id.clone());
    let walk = batch.order().traversal();
    let cancelled = batch
        .slots()
        .iter()
        .filter(|slot| slot.status == SlotStatus::Cancelled);

    for slot in walk.into_iter().chain(cancelled) {
        let position = slot
            .position
            .map_or_else(|| "-".to_string(), |p| p.to_string());
        let marker = if current.as_ref() == Some(&slot.hive_id) {
            "  <- current"
        } else {
            ""
        };
        let inspection = slot
            .inspection_id
            .as_ref()
            .map_or_else(String::new, |id| format!("  {id}"));
        let _ = writeln!(
            out,
            "  {position:>3}  {:<16} {:<10}{inspection}{marker}",
            slot.hive_id.as_str(),
            slot.status.as_str(),
        );
    }
    out
}

#[must_use]
pub fn render_batch_line(batch: &BatchInspection) -> String {
    format!(
        "{}  {:<12} {}  current: {}",
        batch.id(),
        batch.status().as_str(),
        render_progress(&batch.progress()),
        render_slot(batch.current())
    )
}

#[must_use]
pub fn render_current(current: &CurrentHive) -> String {
    let progress = render_progress(&current.progress);
    match (&current.slot, &current.hive_name) {
        (Some(slot), Some(name)) => format!("Current hive: {} ({name})  [{progress}]", slot.hive_id),
        (Some(slot), None) => format!("Current hive: {}  [{progress}]", slot.hive_id),
        (None, _) => format!("No hive left to inspect ({})  [{progress}]", current.status),
    }
}

#[cfg(test)]
mod tests {
    use apiary_core::{BatchId, HiveId};
    use chrono::Utc;

    use super::*;

    fn batch(ids: &[&str]) -> BatchInspection {
        let hives = ids.iter().map(|id| HiveId::parse(id).expect("hive id"));
        BatchInspection::draft(BatchId::generate(), hives, Utc::now()).expect("draft")
    }

    #[test]
    fn batch_view_carries_current_and_progress() {
        let view = BatchView::from(batch(&["H1", "H2"]));
        let json = serde_json::to_value(&view).expect("json");
        assert_eq!(json["status"], "draft");
        assert_eq!(json["current"]["hiveId"], "H1");
        assert_eq!(json["progress"]["pending"], 2);
        assert_eq!(json["slots"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn render_batch_marks_current_hive() {
        let text = render_batch(&batch(&["H1", "H2"]));
        let current_line = text
            .lines()
            .find(|line| line.contains("<- current"))
            .expect("current marker");
        assert!(current_line.contains("H1"));
        assert!(text.contains("0/2 inspected"));
    }
}
