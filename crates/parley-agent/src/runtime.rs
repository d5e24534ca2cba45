// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wires a [`TurnService`] from config and its external adapters.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use parley_cache::TtlCache;
use parley_config::model::ParleyConfig;
use parley_context::ContextAssembler;
use parley_core::{ProviderAdapter, SearchBackend};
use parley_memory::{MemoryExtractor, MemoryRecall};
use parley_search::{WebContextProvider, WebContextSettings};
use parley_storage::PersistenceGateway;

use crate::persistence::TurnPersistence;
use crate::service::{TurnService, TurnSettings};
use crate::title::TitleWriter;

/// Builds the turn service.
///
/// `provider` serves both replies and utility calls (titles, extraction);
/// utility calls use `anthropic.utility_model`.
pub fn build_turn_service(
    config: &ParleyConfig,
    provider: Arc<dyn ProviderAdapter>,
    gateway: Arc<PersistenceGateway>,
    backends: Vec<Arc<dyn SearchBackend>>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
) -> TurnService {
    let lookup_timeout = Duration::from_secs(config.streaming.lookup_timeout_secs);

    let web = WebContextProvider::new(
        backends,
        Arc::new(TtlCache::new(config.cache.max_entries)),
        WebContextSettings::from(&config.search),
        tracker.clone(),
    );
    let recall = MemoryRecall::new(
        Arc::clone(&gateway),
        Arc::new(TtlCache::new(config.cache.max_entries)),
        &config.memory,
        lookup_timeout,
    );
    let assembler = ContextAssembler::new(
        Arc::new(web),
        Arc::new(recall),
        config.memory.recall_limit,
        lookup_timeout,
    );

    let utility_model = config.anthropic.utility_model.clone();
    let extractor = (config.memory.enabled && config.memory.extraction_enabled).then(|| {
        Arc::new(MemoryExtractor::new(
            Arc::clone(&gateway),
            Arc::clone(&provider),
            utility_model.clone(),
        ))
    });
    let titles = Arc::new(TitleWriter::new(Arc::clone(&provider), utility_model));
    let persistence = TurnPersistence::new(
        Arc::clone(&gateway),
        extractor,
        Some(titles),
        tracker.clone(),
        config.agent.fallback_reply.clone(),
    );

    TurnService::new(
        provider,
        gateway,
        Arc::new(assembler),
        Arc::new(persistence),
        TurnSettings::from_config(config),
        tracker,
        shutdown,
    )
}
