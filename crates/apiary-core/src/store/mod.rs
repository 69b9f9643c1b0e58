//! Storage adapters.

mod inspection_log;
mod memory;
mod sqlite;

pub use inspection_log::{InspectionRecord, MemoryInspectionLog, SqliteInspectionLog};
pub use memory::MemoryBatchRepository;
pub use sqlite::SqliteBatchRepository;
