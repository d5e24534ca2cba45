// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-based memory extraction from a completed turn.
//!
//! The utility model is asked for durable facts about the user. Each fact is
//! compared against the user's existing memories by word-set Jaccard
//! similarity: near-duplicates are skipped, close matches are rewritten in
//! place, and everything else becomes a new memory.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use parley_core::types::{ChatMessage, Memory, MemoryPatch, ProviderRequest};
use parley_core::{ParleyError, ProviderAdapter};
use parley_search::text::keywords;
use parley_storage::PersistenceGateway;

/// Similarity above which a new fact is a duplicate.
const DEDUP_THRESHOLD: f64 = 0.9;

/// Similarity at or above which a new fact supersedes an existing one.
const UPDATE_THRESHOLD: f64 = 0.6;

const EXTRACTION_MAX_TOKENS: u32 = 1024;

fn extraction_prompt(user_text: &str, assistant_text: &str) -> String {
    format!(
        r#"Extract facts about the user from this exchange that would be useful to remember in future conversations. Output a JSON array.

For each fact:
- "content": the fact as a standalone statement (e.g., "The user's dog is named Max")
- "category": one of personal, preference, project, decision, instruction
- "importance": 1 (trivia) to 10 (core identity such as the user's name)

Only include facts that are stated by the user, specific, and likely to matter later.
If there is nothing worth remembering, return [].

User: {0}
Assistant: {1}

Output the JSON array only, no explanation:"#,
        user_text, assistant_text
    )
}

/// A fact as returned by the extraction model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractedFact {
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_importance")]
    pub importance: i64,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_importance() -> i64 {
    5
}

impl ExtractedFact {
    fn clamped_importance(&self) -> u8 {
        self.importance.clamp(1, 10) as u8
    }
}

/// What one extraction pass changed.
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    pub created: Vec<Memory>,
    pub updated: Vec<Memory>,
    pub skipped: usize,
}

/// Parses the model's answer into facts.
///
/// Tolerates markdown fences and prose around the array. Anything
/// unparseable yields an empty list.
pub fn parse_extraction_response(response: &str) -> Vec<ExtractedFact> {
    let trimmed = response.trim();
    let json_str = match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => {
            debug!("extraction response holds no JSON array");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<ExtractedFact>>(json_str) {
        Ok(facts) => facts
            .into_iter()
            .filter(|f| !f.content.trim().is_empty())
            .collect(),
        Err(e) => {
            warn!(error = %e, "failed to parse extraction response");
            Vec::new()
        }
    }
}

fn word_set(text: &str) -> HashSet<String> {
    keywords(text, 1).into_iter().collect()
}

/// Jaccard similarity of the two texts' lower-cased word sets.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let a = word_set(a);
    let b = word_set(b);
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let shared = a.intersection(&b).count();
    let total = a.union(&b).count();
    shared as f64 / total as f64
}

fn most_similar<'a>(content: &str, existing: &'a [Memory]) -> Option<(&'a Memory, f64)> {
    existing
        .iter()
        .map(|m| (m, jaccard(content, &m.content)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

/// Extracts and stores long-term memories after a turn.
pub struct MemoryExtractor {
    gateway: Arc<PersistenceGateway>,
    provider: Arc<dyn ProviderAdapter>,
    model: String,
}

impl MemoryExtractor {
    pub fn new(
        gateway: Arc<PersistenceGateway>,
        provider: Arc<dyn ProviderAdapter>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            provider,
            model: model.into(),
        }
    }

    /// Runs one extraction pass for the exchange.
    ///
    /// Only the provider call can fail; storage goes through the gateway,
    /// which never surfaces outages.
    pub async fn extract_from_turn(
        &self,
        user_id: &str,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<ExtractionOutcome, ParleyError> {
        let prompt = extraction_prompt(user_text, assistant_text);
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: EXTRACTION_MAX_TOKENS,
            temperature: Some(0.0),
            stream: false,
        };
        let response = self.provider.complete(request).await?;

        let facts = parse_extraction_response(&response.content);
        let mut outcome = ExtractionOutcome::default();
        if facts.is_empty() {
            return Ok(outcome);
        }

        let mut existing = self.gateway.list_memories(user_id).await;
        for fact in facts {
            let content = fact.content.trim();
            match most_similar(content, &existing) {
                Some((_, sim)) if sim > DEDUP_THRESHOLD => {
                    debug!(similarity = sim, "skipping duplicate memory");
                    outcome.skipped += 1;
                }
                Some((found, sim)) if sim >= UPDATE_THRESHOLD => {
                    debug!(memory_id = %found.id, similarity = sim, "superseding memory");
                    let patch = MemoryPatch {
                        content: Some(content.to_string()),
                        category: Some(fact.category.clone()),
                        importance: Some(fact.clamped_importance()),
                    };
                    let id = found.id.clone();
                    if let Some(updated) = self.gateway.update_memory(&id, &patch).await {
                        if let Some(slot) = existing.iter_mut().find(|m| m.id == id) {
                            *slot = updated.clone();
                        }
                        outcome.updated.push(updated);
                    }
                }
                _ => {
                    let memory = self
                        .gateway
                        .create_memory(user_id, content, &fact.category, fact.clamped_importance())
                        .await;
                    existing.push(memory.clone());
                    outcome.created.push(memory);
                }
            }
        }

        info!(
            user_id,
            created = outcome.created.len(),
            updated = outcome.updated.len(),
            skipped = outcome.skipped,
            "memory extraction finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::GenerationErrorKind;
    use parley_test_utils::{MockProvider, MockReply};

    fn extractor(provider: MockProvider) -> (Arc<PersistenceGateway>, MemoryExtractor) {
        let gateway = Arc::new(PersistenceGateway::in_memory());
        let extractor = MemoryExtractor::new(gateway.clone(), Arc::new(provider), "utility");
        (gateway, extractor)
    }

    #[test]
    fn parse_valid_array_with_defaults() {
        let facts = parse_extraction_response(
            r#"[{"content": "User's dog is named Max", "category": "personal", "importance": 6},
                {"content": "User prefers dark mode"}]"#,
        );
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].importance, 6);
        assert_eq!(facts[1].category, "general");
        assert_eq!(facts[1].importance, 5);
    }

    #[test]
    fn parse_fenced_and_prose_wrapped() {
        let fenced = "```json\n[{\"content\": \"User lives in Berlin\"}]\n```";
        assert_eq!(parse_extraction_response(fenced).len(), 1);

        let prose = "Here you go:\n[{\"content\": \"User uses Rust\"}]\nDone.";
        assert_eq!(parse_extraction_response(prose)[0].content, "User uses Rust");
    }

    #[test]
    fn parse_malformed_is_empty() {
        assert!(parse_extraction_response("not json").is_empty());
        assert!(parse_extraction_response("[{\"oops\": 1}]").is_empty());
        assert!(parse_extraction_response("] [").is_empty());
    }

    #[test]
    fn jaccard_bounds() {
        assert_eq!(jaccard("User likes tea", "user LIKES tea"), 1.0);
        assert_eq!(jaccard("alpha beta", "gamma delta"), 0.0);
        let partial = jaccard(
            "the user lives in sydney with two cats",
            "the user lives in melbourne with two cats",
        );
        assert!(partial > 0.6 && partial < 0.9, "got {partial}");
    }

    #[test]
    fn importance_is_clamped() {
        let fact = ExtractedFact {
            content: "x".into(),
            category: "personal".into(),
            importance: 42,
        };
        assert_eq!(fact.clamped_importance(), 10);
        let fact = ExtractedFact {
            importance: -3,
            ..fact
        };
        assert_eq!(fact.clamped_importance(), 1);
    }

    #[tokio::test]
    async fn creates_updates_and_skips() {
        let (gateway, extractor) = extractor(MockProvider::with_responses(vec![
            r#"[{"content": "The user lives in Melbourne with two cats", "category": "personal", "importance": 7},
                {"content": "The user's name is Ada", "category": "personal", "importance": 10},
                {"content": "User drinks green tea", "category": "preference", "importance": 3}]"#
                .to_string(),
        ]));
        let lives = gateway
            .create_memory("usr_1", "The user lives in Sydney with two cats", "personal", 6)
            .await;
        gateway
            .create_memory("usr_1", "The user's name is Ada", "personal", 10)
            .await;

        let outcome = extractor
            .extract_from_turn("usr_1", "I moved to Melbourne", "Nice!")
            .await
            .unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.updated.len(), 1);
        assert_eq!(outcome.updated[0].id, lives.id);
        assert_eq!(
            outcome.updated[0].content,
            "The user lives in Melbourne with two cats"
        );
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(gateway.list_memories("usr_1").await.len(), 3);
    }

    #[tokio::test]
    async fn placeholder_like_user_text_is_quoted_verbatim() {
        let provider = Arc::new(MockProvider::with_responses(vec!["[]".into()]));
        let gateway = Arc::new(PersistenceGateway::in_memory());
        let extractor = MemoryExtractor::new(gateway, provider.clone(), "utility");
        extractor
            .extract_from_turn("usr_1", "my template uses {assistant} and {user}", "Noted.")
            .await
            .unwrap();

        let requests = provider.requests().await;
        let prompt = &requests[0].messages[0].content;
        assert!(prompt.contains("User: my template uses {assistant} and {user}\n"));
        assert!(prompt.contains("Assistant: Noted.\n"));
    }

    #[tokio::test]
    async fn empty_answer_writes_nothing() {
        let (gateway, extractor) = extractor(MockProvider::with_responses(vec!["[]".into()]));
        let outcome = extractor.extract_from_turn("usr_1", "hi", "hello").await.unwrap();
        assert!(outcome.created.is_empty());
        assert!(gateway.list_memories("usr_1").await.is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_returned() {
        let (_, extractor) = extractor(MockProvider::with_replies(vec![MockReply::fail(
            GenerationErrorKind::RateLimit,
            "slow down",
        )]));
        let err = extractor.extract_from_turn("usr_1", "hi", "hello").await.unwrap_err();
        assert_eq!(err.error_type(), "rate_limit");
    }
}
