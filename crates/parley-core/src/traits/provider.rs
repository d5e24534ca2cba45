// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for the inference backend.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse, ProviderStreamChunk};

/// A boxed stream of provider events.
///
/// Errors yielded mid-stream are always [`ParleyError::Generation`].
pub type ProviderStream =
    Pin<Box<dyn Stream<Item = Result<ProviderStreamChunk, ParleyError>> + Send>>;

/// Adapter for the language model provider.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ParleyError>;

    /// Sends a completion request and returns a stream of response chunks.
    async fn stream(&self, request: ProviderRequest) -> Result<ProviderStream, ParleyError>;
}
