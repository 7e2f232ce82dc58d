//! HTTP surface for Docgate
//!
//! - [`GatewayConfig`]: `docgate.toml` loading and validation
//! - [`build_router`]: the axum router over an [`Executor`]
//! - [`build_gateway`] / [`serve`]: boot sequence used by the `docgate` binary
//! - [`SpecReloader`]: spec directory reloads behind `/api/update_specs`

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod specs;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use docgate_backend::{ArangoBackend, MemoryBackend};
use docgate_core::Backend;
use docgate_executor::Executor;
use docgate_schema::{SharedSpecs, SpecRegistry};
use docgate_security::TokenTable;
use tokio::net::TcpListener;
use tokio::task::{self, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::specs::ensure_collections;

pub use config::{BackendKind, GatewayConfig};
pub use error::{AppError, ServeError};
pub use logging::install_tracing_subscriber;
pub use routes::{build_router, AppState, ServerState};
pub use specs::{ReloadSummary, SpecReloader};

/// A booted gateway: the executor and the reloader feeding its specs.
pub struct Gateway {
    /// Runs every request.
    pub executor: Arc<Executor>,
    /// Reloads the spec directory the executor reads from.
    pub reloader: Arc<SpecReloader>,
}

/// Load the spec directory, connect the configured backend and create every
/// schema's collection.
///
/// An unreachable database is logged and tolerated so the status endpoint can
/// report it; a database that refuses to create a collection fails boot.
///
/// # Errors
///
/// Returns an error if the spec directory is invalid or a collection cannot
/// be created.
pub fn build_gateway(config: &GatewayConfig) -> Result<Gateway, ServeError> {
    let loaded = SpecRegistry::load_dir(&config.spec_dir)?;
    let backend: Arc<dyn Backend> = match config.backend.kind {
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
        BackendKind::Arango => Arc::new(ArangoBackend::new(config.arango_options())),
    };
    ensure_collections(backend.as_ref(), &loaded, true)?;

    let specs = Arc::new(SharedSpecs::new(loaded));
    let executor = Executor::with_specs(
        Arc::clone(&backend),
        Arc::clone(&specs),
        config.executor_options(),
    );
    Ok(Gateway {
        executor: Arc::new(executor),
        reloader: Arc::new(SpecReloader::new(config.spec_dir.clone(), specs, backend)),
    })
}

/// Periodically expire idle cursors until the returned handle is aborted.
pub fn spawn_cursor_sweeper(executor: Arc<Executor>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let executor = Arc::clone(&executor);
            match task::spawn_blocking(move || executor.sweep_cursors()).await {
                Ok(0) => {}
                Ok(swept) => debug!(swept, "expired idle cursors"),
                Err(err) => warn!(?err, "cursor sweep task failed"),
            }
        }
    })
}

/// Serve `gateway` on `addr` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(
    gateway: Gateway,
    tokens: TokenTable,
    addr: SocketAddr,
    sweep_interval: Duration,
) -> Result<(), ServeError> {
    let sweeper = spawn_cursor_sweeper(Arc::clone(&gateway.executor), sweep_interval);
    let state = Arc::new(ServerState::new(gateway, tokens));
    let app = build_router(state);
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "docgate listening");
    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await;
    sweeper.abort();
    served?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => tracing::error!(?err, "failed to listen for shutdown signal"),
    }
}
