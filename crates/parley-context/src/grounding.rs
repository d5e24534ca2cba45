// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lookup seams for the two grounding sources.

use async_trait::async_trait;

use parley_core::ParleyError;
use parley_core::types::{Memory, WebContext};
use parley_memory::MemoryRecall;
use parley_search::WebContextProvider;

/// A source of web grounding for a query.
#[async_trait]
pub trait WebGrounding: Send + Sync {
    /// Returns grounding for `query`, or `None` when there is none to add.
    async fn web_context(
        &self,
        query: &str,
        grounding_enabled: bool,
    ) -> Result<Option<WebContext>, ParleyError>;
}

/// A source of recalled long-term memories.
#[async_trait]
pub trait MemoryGrounding: Send + Sync {
    /// Returns at most `limit` memories for the user, best first.
    async fn memories(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Memory>, ParleyError>;
}

#[async_trait]
impl WebGrounding for WebContextProvider {
    async fn web_context(
        &self,
        query: &str,
        grounding_enabled: bool,
    ) -> Result<Option<WebContext>, ParleyError> {
        Ok(self.build_context(query, grounding_enabled).await)
    }
}

#[async_trait]
impl MemoryGrounding for MemoryRecall {
    async fn memories(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Memory>, ParleyError> {
        Ok(self.recall(user_id, query, limit).await)
    }
}
