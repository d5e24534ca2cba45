// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Related-query derivation for cache pre-warming.

use chrono::NaiveDate;

use crate::text::{keywords, normalize_query};

/// Terms that make a query time-sensitive.
const TIME_SENSITIVE: &[&str] = &[
    "weather", "forecast", "news", "today", "tonight", "latest", "current", "now", "price",
    "prices", "score", "scores", "stock", "stocks",
];

/// Derives up to `max` follow-up queries a user is likely to ask next.
///
/// Candidates, in order: the first three keywords, the query with today's
/// date appended (time-sensitive queries only), and a topic expansion.
/// Candidates equal to the query or to each other are dropped.
pub fn derive_related_queries(query: &str, today: NaiveDate, max: usize) -> Vec<String> {
    let normalized = normalize_query(query);
    if normalized.is_empty() {
        return Vec::new();
    }

    let terms = keywords(&normalized, 3);
    let mut candidates = Vec::new();

    let truncated = terms.iter().take(3).cloned().collect::<Vec<_>>().join(" ");
    if !truncated.is_empty() {
        candidates.push(truncated);
    }

    let time_sensitive = normalized
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| TIME_SENSITIVE.contains(&w));
    if time_sensitive {
        candidates.push(format!("{normalized} {}", today.format("%Y-%m-%d")));
    }

    if normalized.starts_with("how to ") {
        candidates.push(format!("{normalized} tutorial"));
    } else {
        candidates.push(format!("{normalized} overview"));
    }

    let mut related: Vec<String> = Vec::new();
    for candidate in candidates {
        if candidate != normalized && !related.contains(&candidate) {
            related.push(candidate);
        }
    }
    related.truncate(max);
    related
}
