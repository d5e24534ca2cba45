// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context assembly over the real search and memory providers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::task::TaskTracker;

use parley_cache::TtlCache;
use parley_config::model::{AgentConfig, MemoryConfig, SearchConfig};
use parley_context::{BaseInstruction, ContextAssembler, build_prompt};
use parley_core::SearchBackend;
use parley_core::types::{ChatMessage, Role};
use parley_memory::MemoryRecall;
use parley_search::{WebContextProvider, WebContextSettings};
use parley_storage::PersistenceGateway;
use parley_test_utils::{MockSearchBackend, sample_hits};

fn assembler(
    backends: Vec<Arc<dyn SearchBackend>>,
    gateway: Arc<PersistenceGateway>,
) -> ContextAssembler {
    let web = WebContextProvider::new(
        backends,
        Arc::new(TtlCache::new(64)),
        WebContextSettings::from(&SearchConfig::default()),
        TaskTracker::new(),
    );
    let recall = MemoryRecall::new(
        gateway,
        Arc::new(TtlCache::new(64)),
        &MemoryConfig::default(),
        Duration::from_secs(3),
    );
    ContextAssembler::new(Arc::new(web), Arc::new(recall), 5, Duration::from_secs(3))
}

#[tokio::test]
async fn grounding_disabled_and_no_memories_leaves_prompt_bare() {
    let backend = Arc::new(MockSearchBackend::new("brave", sample_hits("brave", 3)));
    let gateway = Arc::new(PersistenceGateway::in_memory());
    let assembled = assembler(vec![backend.clone() as Arc<dyn SearchBackend>], gateway)
        .assemble(Some("usr_1"), "what's new in rust?", false)
        .await;

    assert!(assembled.web_context.is_none());
    assert!(assembled.memories.is_empty());
    assert_eq!(backend.calls(), 0);

    let base = BaseInstruction::from_config(&AgentConfig::default());
    let history = vec![ChatMessage::user("what's new in rust?")];
    let prompt = build_prompt(
        &base,
        Utc::now(),
        &assembled.memories,
        &history,
        assembled.web_context.as_ref(),
    );
    assert_eq!(prompt.len(), 2);
    assert_eq!(prompt[1].role, Role::User);
    assert!(!prompt[0].content.contains("## Relevant Memories"));
    assert!(!prompt.iter().any(|m| m.content.contains("Web search results")));
}

#[tokio::test]
async fn empty_primary_backend_defers_to_secondary() {
    let primary = Arc::new(MockSearchBackend::new("brave", Vec::new()));
    let secondary = Arc::new(MockSearchBackend::new("tavily", sample_hits("tavily", 3)));
    let gateway = Arc::new(PersistenceGateway::in_memory());
    gateway
        .create_memory("usr_1", "User follows rust releases closely", "preference", 6)
        .await;

    let assembled = assembler(vec![primary as Arc<dyn SearchBackend>, secondary], gateway)
        .assemble(Some("usr_1"), "latest rust releases", true)
        .await;

    let web = assembled.web_context.expect("secondary backend should ground the turn");
    assert_eq!(web.sources.len(), 3);
    assert!(web.sources.iter().all(|s| s.source_label == "tavily"));
    for n in 1..=3 {
        assert!(web.text.contains(&format!("[{n}] tavily result {n}")));
    }
    assert!(!web.text.contains("[4]"));
    assert_eq!(assembled.memories.len(), 1);
}
