// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Web search backend trait.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::types::SearchHit;

/// One ranked web search backend.
///
/// Backends are tried in order; an empty result means "try the next one".
#[async_trait]
pub trait SearchBackend: Send + Sync + 'static {
    /// Short label stored as `source_label` on the hits this backend returns.
    fn name(&self) -> &str;

    /// Runs a query and returns at most `count` hits.
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>, ParleyError>;
}
