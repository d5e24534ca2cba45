// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock web search backend.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use parley_core::types::SearchHit;
use parley_core::{ParleyError, SearchBackend};

/// A search backend returning fixed hits, with switchable failure and a
/// record of every query it saw.
pub struct MockSearchBackend {
    name: String,
    hits: Vec<SearchHit>,
    failing: AtomicBool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl MockSearchBackend {
    pub fn new(name: &str, hits: Vec<SearchHit>) -> Self {
        Self {
            name: name.to_string(),
            hits,
            failing: AtomicBool::new(false),
            delay: None,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// A backend whose every search errors.
    pub fn failing(name: &str) -> Self {
        let backend = Self::new(name, Vec::new());
        backend.set_failing(true);
        backend
    }

    /// Sleeps (on the tokio clock) before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

/// `n` distinct hits labelled with `source`.
pub fn sample_hits(source: &str, n: usize) -> Vec<SearchHit> {
    (1..=n)
        .map(|i| SearchHit {
            title: format!("{source} result {i}"),
            url: format!("https://{source}.example.com/{i}"),
            content: format!("Snippet {i} from {source}."),
            source_label: source.to_string(),
            published_at: None,
        })
        .collect()
}

#[async_trait]
impl SearchBackend for MockSearchBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>, ParleyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ParleyError::Upstream {
                service: self.name.clone(),
                message: "injected failure".into(),
            });
        }
        Ok(self.hits.iter().take(count).cloned().collect())
    }
}
