//! HTTP API over the batch engine.

pub mod error;
pub mod routes;

use std::net::SocketAddr;

use anyhow::Result;
use apiary_core::BatchEngine;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: BatchEngine,
}

impl AppState {
    pub const fn new(engine: BatchEngine) -> Self {
        Self { engine }
    }
}

/// Router with middleware, ready to serve.
pub fn create_app(state: AppState) -> Router {
    routes::create_router()
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails
pub async fn run_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Apiary server listening on {}", listener.local_addr()?);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Apiary server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
