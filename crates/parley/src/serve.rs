// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley serve`: wires the adapters together and runs the gateway until a
//! shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use parley_agent::{build_turn_service, drain_background, install_signal_handler};
use parley_anthropic::AnthropicProvider;
use parley_config::model::{ParleyConfig, StorageConfig};
use parley_core::ParleyError;
use parley_gateway::GatewayState;
use parley_search::build_backends;
use parley_storage::{PersistenceGateway, SqliteStore};

/// Runs the server until SIGINT/SIGTERM, then drains background work.
pub async fn run_serve(config: ParleyConfig) -> Result<(), ParleyError> {
    init_tracing(&config.agent.log_level);
    info!(agent = %config.agent.name, "starting parley serve");

    // A missing provider key is fatal before anything else starts.
    let provider = Arc::new(AnthropicProvider::new(&config.anthropic)?);
    let backends = build_backends(&config.search)?;
    if config.search.enabled && backends.is_empty() {
        warn!("web grounding enabled but no search backend is configured");
    }

    let gateway = Arc::new(open_gateway(&config.storage).await);
    let tracker = TaskTracker::new();
    let shutdown = install_signal_handler();

    let service = build_turn_service(
        &config,
        provider,
        gateway.clone(),
        backends,
        tracker.clone(),
        shutdown.clone(),
    );
    let state = GatewayState::new(Arc::new(service));

    let served = parley_gateway::serve(&config.gateway, state, shutdown.clone()).await;
    shutdown.cancel();

    let grace = Duration::from_secs(config.gateway.shutdown_grace_secs);
    if !drain_background(&tracker, grace).await {
        warn!(grace_secs = grace.as_secs(), "background work abandoned at shutdown");
    }
    gateway.shutdown().await;

    info!("parley stopped");
    served
}

/// Opens the SQLite primary store, or serves from memory alone when it
/// cannot be opened.
pub async fn open_gateway(config: &StorageConfig) -> PersistenceGateway {
    let store = SqliteStore::new(config.clone());
    match store.initialize().await {
        Ok(()) => PersistenceGateway::new(Arc::new(store)),
        Err(e) => {
            warn!(
                error = %e,
                path = %config.database_path,
                "primary store unavailable at startup, using in-memory fallback"
            );
            PersistenceGateway::in_memory()
        }
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
