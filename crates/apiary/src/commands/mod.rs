//! Command implementations, one `run` per subcommand.

pub mod batch;
pub mod serve;
pub mod walk;

use anyhow::Result;
use apiary_core::{BatchId, HiveId};

pub(crate) fn parse_batch_id(raw: &str) -> Result<BatchId> {
    BatchId::parse(raw).map_err(|e| apiary_core::Error::from(e).into())
}

pub(crate) fn parse_hive_id(raw: &str) -> Result<HiveId> {
    HiveId::parse(raw).map_err(|e| apiary_core::Error::from(e).into())
}

pub(crate) fn parse_hive_ids<S: AsRef<str>>(raw: &[S]) -> Result<Vec<HiveId>> {
    raw.iter().map(|id| parse_hive_id(id.as_ref())).collect()
}
