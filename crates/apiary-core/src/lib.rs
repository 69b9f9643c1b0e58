//! # Apiary Core
//!
//! Batch inspection engine: walks a beekeeper through inspecting a set of
//! hives in one session.
//!
//! ## Laws (Compiler Enforced)
//!
//! - No `unwrap()` - returns `Result` instead
//! - No `expect()` - returns `Result` instead
//! - No `panic!()` - returns `Result` instead
//! - No `unsafe` - safe Rust only
//!
//! ## Layout
//!
//! - [`domain`]: the aggregate, its state machines and the slot ordering model
//! - [`engine`]: transactional operations over a repository
//! - [`repository`] / [`store`]: persistence boundary and its adapters
//! - [`collaborators`]: ports to the inspection service and hive directory
//! - [`config`]: layered TOML and environment configuration

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

pub mod collaborators;
pub mod config;
pub mod domain;
pub mod engine;
mod error;
pub mod repository;
pub mod store;

pub use collaborators::{HiveDirectory, InspectionDraft, InspectionService, StaticHiveDirectory};
pub use config::{load_config, Config};
pub use domain::{
    BatchEvent, BatchId, BatchInspection, BatchStatus, HiveId, HiveSlot, InspectionId,
    SlotStatus,
};
pub use engine::{
    BatchEngine, CurrentHive, EngineSettings, InspectOutcome, InspectionSubmission,
    MutationOutcome,
};
pub use error::{Error, Result};
pub use repository::BatchRepository;
