// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword-overlap memory recall with a per-(user, query) cache.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use parley_cache::TtlCache;
use parley_config::model::MemoryConfig;
use parley_core::types::Memory;
use parley_search::normalize_query;
use parley_search::text::keywords;
use parley_storage::PersistenceGateway;

/// Importance at or above which a memory is recalled regardless of overlap.
const CORE_FACT_IMPORTANCE: u8 = 9;

/// Minimum term length counted as significant.
const MIN_TERM_LEN: usize = 3;

/// Share of the query's significant terms that appear in `content`.
fn relevance(query_terms: &[String], content: &str) -> f64 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let words: HashSet<String> = keywords(content, 1).into_iter().collect();
    let hits = query_terms.iter().filter(|t| words.contains(*t)).count();
    hits as f64 / query_terms.len() as f64
}

/// Ranks `memories` against `query`.
///
/// Score is `relevance * 10 + importance`; ties go to the most recently
/// updated memory. Memories with no overlap are dropped unless they are core
/// facts.
pub fn rank_memories(memories: Vec<Memory>, query: &str) -> Vec<Memory> {
    let mut terms = keywords(query, MIN_TERM_LEN);
    let mut seen = HashSet::new();
    terms.retain(|t| seen.insert(t.clone()));

    let mut scored: Vec<(f64, Memory)> = memories
        .into_iter()
        .filter_map(|memory| {
            let rel = relevance(&terms, &memory.content);
            (rel > 0.0 || memory.importance >= CORE_FACT_IMPORTANCE)
                .then(|| (rel * 10.0 + f64::from(memory.importance), memory))
        })
        .collect();

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.1.updated_at.cmp(&a.1.updated_at))
    });
    scored.into_iter().map(|(_, memory)| memory).collect()
}

/// Renders recalled memories as the prompt's memory block.
pub fn format_memory_block(memories: &[Memory]) -> String {
    let mut text = String::from("## Relevant Memories\n");
    for memory in memories {
        text.push_str(&format!("- {}\n", memory.content));
    }
    text
}

/// Recalls a user's most relevant memories for a query.
pub struct MemoryRecall {
    gateway: Arc<PersistenceGateway>,
    cache: Arc<TtlCache<Vec<Memory>>>,
    enabled: bool,
    ttl: Duration,
    lookup_timeout: Duration,
}

impl MemoryRecall {
    pub fn new(
        gateway: Arc<PersistenceGateway>,
        cache: Arc<TtlCache<Vec<Memory>>>,
        config: &MemoryConfig,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            cache,
            enabled: config.enabled,
            ttl: Duration::from_secs(config.cache_ttl_secs),
            lookup_timeout,
        }
    }

    fn cache_key(user_id: &str, query: &str) -> String {
        format!("{user_id}\u{1f}{}", normalize_query(query))
    }

    /// Returns at most `limit` memories, best first.
    ///
    /// Never fails: a slow or broken lookup yields an empty list.
    pub async fn recall(&self, user_id: &str, query: &str, limit: usize) -> Vec<Memory> {
        if !self.enabled || limit == 0 {
            return Vec::new();
        }

        let key = Self::cache_key(user_id, query);
        if let Some(mut cached) = self.cache.get(&key) {
            debug!(user_id, "memory recall cache hit");
            cached.truncate(limit);
            return cached;
        }

        let ranked = match tokio::time::timeout(
            self.lookup_timeout,
            self.gateway.list_memories(user_id),
        )
        .await
        {
            Ok(memories) => rank_memories(memories, query),
            Err(_) => {
                warn!(user_id, timeout = ?self.lookup_timeout, "memory lookup timed out");
                return Vec::new();
            }
        };

        self.cache.set(key, ranked.clone(), self.ttl);
        let mut recalled = ranked;
        recalled.truncate(limit);
        debug!(user_id, recalled = recalled.len(), "memories recalled");
        recalled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(content: &str, importance: u8, updated_at: &str) -> Memory {
        let mut m = Memory::new("usr_1", content, "personal", importance);
        m.updated_at = updated_at.to_string();
        m
    }

    #[test]
    fn relevance_outweighs_importance_and_core_facts_stay() {
        let ranked = rank_memories(
            vec![
                memory("The user's name is Ada", 9, "2026-01-01T00:00:00.000Z"),
                memory("User is planning a trip to Sydney in March", 5, "2026-01-02T00:00:00.000Z"),
                memory("User likes green tea", 3, "2026-01-03T00:00:00.000Z"),
            ],
            "What's the weather like in Sydney for my trip?",
        );
        let contents: Vec<&str> = ranked.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "User is planning a trip to Sydney in March",
                "The user's name is Ada",
            ]
        );
    }

    #[test]
    fn ties_break_by_recency() {
        let ranked = rank_memories(
            vec![
                memory("User likes rust", 5, "2026-01-01T00:00:00.000Z"),
                memory("User writes rust daily", 5, "2026-02-01T00:00:00.000Z"),
            ],
            "rust",
        );
        assert_eq!(ranked[0].content, "User writes rust daily");
    }

    #[test]
    fn no_terms_keeps_only_core_facts() {
        let ranked = rank_memories(
            vec![
                memory("The user's name is Ada", 10, "2026-01-01T00:00:00.000Z"),
                memory("User likes tea", 5, "2026-01-01T00:00:00.000Z"),
            ],
            "hi",
        );
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn block_lists_memories_as_bullets() {
        let block = format_memory_block(&[memory("User likes tea", 5, "x")]);
        assert_eq!(block, "## Relevant Memories\n- User likes tea\n");
    }

    #[tokio::test]
    async fn recall_limits_and_caches() {
        let gateway = Arc::new(PersistenceGateway::in_memory());
        gateway.create_memory("usr_1", "User lives in Sydney", "personal", 6).await;
        gateway.create_memory("usr_1", "User visits Sydney beaches", "personal", 5).await;
        gateway.create_memory("usr_2", "Sydney resident", "personal", 9).await;

        let recall = MemoryRecall::new(
            gateway.clone(),
            Arc::new(TtlCache::new(16)),
            &MemoryConfig::default(),
            Duration::from_secs(3),
        );

        let first = recall.recall("usr_1", "sydney", 1).await;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].content, "User lives in Sydney");

        gateway.create_memory("usr_1", "User moved away from Sydney", "personal", 10).await;
        let cached = recall.recall("usr_1", "  Sydney ", 5).await;
        assert_eq!(cached.len(), 2, "answer should come from the cache");
        assert!(cached.iter().all(|m| m.owner_user_id == "usr_1"));
    }

    #[tokio::test]
    async fn disabled_recall_is_empty() {
        let gateway = Arc::new(PersistenceGateway::in_memory());
        gateway.create_memory("usr_1", "The user's name is Ada", "personal", 10).await;
        let config = MemoryConfig {
            enabled: false,
            ..MemoryConfig::default()
        };
        let recall = MemoryRecall::new(
            gateway,
            Arc::new(TtlCache::new(16)),
            &config,
            Duration::from_secs(3),
        );
        assert!(recall.recall("usr_1", "name", 5).await.is_empty());
    }
}
