// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn orchestration for Parley.
//!
//! A turn is validated, bound to a (possibly new) conversation, grounded by
//! [`parley_context`], generated through the provider, relayed in batches
//! by the [`StreamingPipeline`], and recorded by [`TurnPersistence`]. Memory
//! extraction and title rewrites run afterwards on a shared task tracker.

pub mod flush;
pub mod persistence;
pub mod pipeline;
pub mod runtime;
pub mod service;
pub mod shutdown;
pub mod title;

pub use flush::{FlushPolicy, should_flush};
pub use persistence::{ConversationTarget, FollowUp, PersistedTurn, TurnPersistence};
pub use pipeline::{PipelineResult, PipelineState, StreamingPipeline, TurnOutcome};
pub use runtime::build_turn_service;
pub use service::{TurnReply, TurnRequest, TurnService, TurnSettings, TurnStream, TurnSummary};
pub use shutdown::{drain_background, install_signal_handler};
pub use title::TitleWriter;
