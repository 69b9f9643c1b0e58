//! Wiring: configuration, storage and the engine built from them.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use apiary_core::{
    load_config,
    store::{MemoryBatchRepository, MemoryInspectionLog, SqliteBatchRepository, SqliteInspectionLog},
    BatchEngine, Config, StaticHiveDirectory,
};
use clap::ArgMatches;
use tracing::debug;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    pub json: bool,
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            json: matches.get_flag("json"),
            config: matches.get_one::<String>("config").map(PathBuf::from),
            db: matches.get_one::<String>("db").map(PathBuf::from),
        }
    }
}

/// Where batch state lives for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Sqlite,
    Memory,
}

/// Everything a command needs.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
    pub engine: BatchEngine,
}

impl AppContext {
    /// Load configuration for `options`, then open storage.
    pub async fn load(options: &GlobalOptions, storage: Storage) -> Result<Self> {
        let mut config = load_config(options.config.as_deref()).await?;
        if let Some(db) = &options.db {
            config.state_db = db.display().to_string();
        }
        Self::open(config, storage).await
    }

    pub async fn open(config: Config, storage: Storage) -> Result<Self> {
        let hives = Arc::new(StaticHiveDirectory::from_config(&config.hives));
        let settings = config.engine_settings();

        let engine = match storage {
            Storage::Memory => BatchEngine::new(
                Arc::new(MemoryBatchRepository::new()),
                Arc::new(MemoryInspectionLog::new()),
                hives,
                settings,
            ),
            Storage::Sqlite => {
                let path = config.state_db_path();
                debug!(path = %path.display(), "Opening state database");
                let repository = SqliteBatchRepository::open(&path)
                    .await
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                let inspections = SqliteInspectionLog::new(repository.pool().clone());
                inspections.init().await?;
                BatchEngine::new(
                    Arc::new(repository),
                    Arc::new(inspections),
                    hives,
                    settings,
                )
            }
        };

        Ok(Self { config, engine })
    }
}
