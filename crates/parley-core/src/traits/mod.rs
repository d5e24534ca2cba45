// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Provider and storage adapters extend the [`PluginAdapter`] base trait.
//! All traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod provider;
pub mod search;
pub mod storage;

pub use adapter::PluginAdapter;
pub use provider::{ProviderAdapter, ProviderStream};
pub use search::SearchBackend;
pub use storage::PrimaryStore;
