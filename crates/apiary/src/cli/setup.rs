//! Process setup.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialize tracing to stderr.
///
/// Commands log warnings by default so stdout stays clean; the server logs at
/// info. `RUST_LOG` adds directives on top.
///
/// # Errors
/// Returns an error if a global subscriber is already installed
pub fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {e}"))
}
