//! `apiary serve`: run the HTTP API until interrupted.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tracing::info;

use crate::{context::AppContext, server};

/// Serve command options
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    /// Overrides `server.bind`
    pub bind: Option<String>,
    pub memory: bool,
}

/// Bind address: the flag wins over configuration.
///
/// # Errors
///
/// Returns an error if the address does not parse
pub fn resolve_bind(ctx: &AppContext, options: &ServeOptions) -> Result<SocketAddr> {
    match &options.bind {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid bind address '{raw}'")),
        None => Ok(ctx.config.bind_addr()?),
    }
}

/// # Errors
///
/// Returns an error if the address is taken or the server fails
pub async fn run(ctx: AppContext, options: &ServeOptions) -> Result<()> {
    let addr = resolve_bind(&ctx, options)?;
    let storage = if options.memory {
        "memory".to_string()
    } else {
        ctx.config.state_db_path().display().to_string()
    };
    info!(%addr, storage = %storage, "Starting apiary server");

    server::run_server(addr, server::AppState::new(ctx.engine)).await
}
