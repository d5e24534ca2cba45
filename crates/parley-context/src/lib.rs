// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context assembly for Parley turns.
//!
//! [`ContextAssembler`] runs web grounding and memory recall concurrently,
//! each under its own timeout, and [`build_prompt`] merges the results into
//! the provider prompt. A failing or slow lookup only empties its own slot.

pub mod grounding;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use parley_core::types::{Memory, WebContext};

pub use grounding::{MemoryGrounding, WebGrounding};
pub use prompt::{BaseInstruction, build_prompt};

/// The grounding gathered for one turn.
#[derive(Debug, Clone, Default)]
pub struct AssembledContext {
    pub web_context: Option<WebContext>,
    pub memories: Vec<Memory>,
}

/// Runs the per-turn grounding lookups.
pub struct ContextAssembler {
    web: Arc<dyn WebGrounding>,
    memory: Arc<dyn MemoryGrounding>,
    recall_limit: usize,
    lookup_timeout: Duration,
}

impl ContextAssembler {
    pub fn new(
        web: Arc<dyn WebGrounding>,
        memory: Arc<dyn MemoryGrounding>,
        recall_limit: usize,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            web,
            memory,
            recall_limit,
            lookup_timeout,
        }
    }

    /// Gathers web grounding and memories for `query`.
    ///
    /// Memory recall is skipped for anonymous turns.
    pub async fn assemble(
        &self,
        user_id: Option<&str>,
        query: &str,
        grounding_enabled: bool,
    ) -> AssembledContext {
        let web_lookup = async {
            match tokio::time::timeout(
                self.lookup_timeout,
                self.web.web_context(query, grounding_enabled),
            )
            .await
            {
                Ok(Ok(context)) => context,
                Ok(Err(e)) => {
                    warn!(error = %e, "web grounding failed, continuing without it");
                    None
                }
                Err(_) => {
                    warn!(timeout = ?self.lookup_timeout, "web grounding timed out");
                    None
                }
            }
        };

        let memory_lookup = async {
            let Some(user_id) = user_id else {
                return Vec::new();
            };
            match tokio::time::timeout(
                self.lookup_timeout,
                self.memory.memories(user_id, query, self.recall_limit),
            )
            .await
            {
                Ok(Ok(memories)) => memories,
                Ok(Err(e)) => {
                    warn!(error = %e, "memory recall failed, continuing without it");
                    Vec::new()
                }
                Err(_) => {
                    warn!(timeout = ?self.lookup_timeout, "memory recall timed out");
                    Vec::new()
                }
            }
        };

        let (web_context, memories) = tokio::join!(web_lookup, memory_lookup);
        debug!(
            web = web_context.is_some(),
            memories = memories.len(),
            "context assembled"
        );
        AssembledContext {
            web_context,
            memories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_core::ParleyError;
    use parley_test_utils::sample_hits;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FixedWeb {
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl WebGrounding for FixedWeb {
        async fn web_context(
            &self,
            query: &str,
            grounding_enabled: bool,
        ) -> Result<Option<WebContext>, ParleyError> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(ParleyError::Upstream {
                    service: "search".into(),
                    message: "down".into(),
                });
            }
            Ok(grounding_enabled.then(|| WebContext {
                query: query.to_string(),
                text: "[1] result".into(),
                sources: sample_hits("brave", 1),
            }))
        }
    }

    struct FixedMemory {
        delay: Duration,
        fail: bool,
        called: AtomicBool,
    }

    impl FixedMemory {
        fn new(delay: Duration, fail: bool) -> Self {
            Self {
                delay,
                fail,
                called: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl MemoryGrounding for FixedMemory {
        async fn memories(
            &self,
            user_id: &str,
            _query: &str,
            limit: usize,
        ) -> Result<Vec<Memory>, ParleyError> {
            self.called.store(true, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(ParleyError::Internal("boom".into()));
            }
            Ok((0..limit)
                .map(|i| Memory::new(user_id, &format!("fact {i}"), "personal", 5))
                .collect())
        }
    }

    fn assembler(web: FixedWeb, memory: Arc<FixedMemory>) -> ContextAssembler {
        ContextAssembler::new(Arc::new(web), memory, 2, Duration::from_secs(3))
    }

    #[tokio::test(start_paused = true)]
    async fn both_lookups_contribute() {
        let memory = Arc::new(FixedMemory::new(Duration::from_millis(100), false));
        let ctx = assembler(
            FixedWeb {
                delay: Duration::from_millis(200),
                fail: false,
            },
            memory,
        )
        .assemble(Some("usr_1"), "weather", true)
        .await;
        assert!(ctx.web_context.is_some());
        assert_eq!(ctx.memories.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn lookups_run_concurrently() {
        let memory = Arc::new(FixedMemory::new(Duration::from_secs(2), false));
        let started = tokio::time::Instant::now();
        assembler(
            FixedWeb {
                delay: Duration::from_secs(2),
                fail: false,
            },
            memory,
        )
        .assemble(Some("usr_1"), "weather", true)
        .await;
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_web_does_not_cancel_memory() {
        let memory = Arc::new(FixedMemory::new(Duration::from_millis(500), false));
        let ctx = assembler(
            FixedWeb {
                delay: Duration::ZERO,
                fail: true,
            },
            memory,
        )
        .assemble(Some("usr_1"), "weather", true)
        .await;
        assert!(ctx.web_context.is_none());
        assert_eq!(ctx.memories.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_memory_times_out_to_empty() {
        let memory = Arc::new(FixedMemory::new(Duration::from_secs(60), false));
        let ctx = assembler(
            FixedWeb {
                delay: Duration::ZERO,
                fail: false,
            },
            memory,
        )
        .assemble(Some("usr_1"), "weather", true)
        .await;
        assert!(ctx.web_context.is_some());
        assert!(ctx.memories.is_empty());
    }

    #[tokio::test]
    async fn failing_memory_is_empty() {
        let memory = Arc::new(FixedMemory::new(Duration::ZERO, true));
        let ctx = assembler(
            FixedWeb {
                delay: Duration::ZERO,
                fail: false,
            },
            memory,
        )
        .assemble(Some("usr_1"), "weather", true)
        .await;
        assert!(ctx.memories.is_empty());
        assert!(ctx.web_context.is_some());
    }

    #[tokio::test]
    async fn anonymous_turn_skips_recall() {
        let memory = Arc::new(FixedMemory::new(Duration::ZERO, false));
        let ctx = assembler(
            FixedWeb {
                delay: Duration::ZERO,
                fail: false,
            },
            memory.clone(),
        )
        .assemble(None, "weather", false)
        .await;
        assert!(ctx.web_context.is_none());
        assert!(ctx.memories.is_empty());
        assert!(!memory.called.load(Ordering::SeqCst));
    }
}
