//! Domain layer: pure batch inspection logic with no I/O.
//!
//! - `identifiers`: validated newtypes parsed at the boundaries
//! - `status`: batch and slot state machines
//! - `ordering`: the slot ordering model
//! - `resolver`: derives the current hive from slot state
//! - `batch`: the aggregate tying the pieces together
//! - `events`: what each mutation produced

pub mod batch;
pub mod events;
pub mod identifiers;
pub mod ordering;
pub mod resolver;
pub mod slot;
pub mod status;

pub use batch::{BatchCommand, BatchInspection, BatchRecord, Progress};
pub use events::BatchEvent;
pub use identifiers::{BatchId, HiveId, IdentifierError, InspectionId};
pub use ordering::SlotOrder;
pub use resolver::resolve_current;
pub use slot::HiveSlot;
pub use status::{BatchStatus, SlotStatus, TransitionError};
