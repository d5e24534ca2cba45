// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Web grounding for Parley.
//!
//! [`WebContextProvider`] turns a user query into a numbered, citable block
//! of web results. Backends ([`BraveBackend`], [`TavilyBackend`]) are tried
//! in configured order; results are cached by normalized query and related
//! queries are pre-warmed in the background.

pub mod brave;
pub mod provider;
pub mod related;
pub mod tavily;
pub mod text;

pub use brave::BraveBackend;
pub use provider::{WebContextProvider, WebContextSettings, build_backends, format_context};
pub use related::derive_related_queries;
pub use tavily::TavilyBackend;
pub use text::normalize_query;
