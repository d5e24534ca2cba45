// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for Parley crates.
//!
//! Nothing here touches the network: [`MockProvider`] scripts model replies,
//! [`MockSearchBackend`] serves fixed hits, and [`FlakyStore`] wraps a real
//! primary store so tests can take it offline mid-process.

pub mod flaky_store;
pub mod mock_provider;
pub mod mock_search;

pub use flaky_store::FlakyStore;
pub use mock_provider::{MockProvider, MockReply, tokenize};
pub use mock_search::{MockSearchBackend, sample_hits};
