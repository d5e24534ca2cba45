// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory for Parley.
//!
//! [`MemoryRecall`] ranks a user's stored memories against the current query
//! and caches the answer per (user, query). [`MemoryExtractor`] runs after a
//! turn, asks a model for durable facts, and merges them into the store.

pub mod extractor;
pub mod recall;

pub use extractor::{ExtractedFact, ExtractionOutcome, MemoryExtractor, parse_extraction_response};
pub use recall::{MemoryRecall, format_memory_block, rank_memories};
