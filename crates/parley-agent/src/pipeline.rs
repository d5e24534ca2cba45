// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relays a provider token stream to the transport in batches.
//!
//! States run `Starting -> Streaming -> (ReferenceAppend) -> Closed`, with
//! `Errored` reachable from `Streaming`. Everything sent to the transport is
//! also kept in the accumulation buffer except the inline error marker and
//! the `<ref-data>` sentinel, which are transport-only.

use futures::StreamExt;
use strum::Display;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use parley_core::types::{ProviderStreamChunk, SearchHit, TokenUsage};
use parley_core::{ParleyError, ProviderStream};

use crate::flush::{FlushPolicy, should_flush};

/// Lifecycle of one streamed reply.
///
/// `Errored` is only entered from `Streaming`. A reply that ends with no
/// tokens and no error goes straight from `Starting` to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PipelineState {
    Starting,
    Streaming,
    ReferenceAppend,
    Errored,
    Closed,
}

/// How the reply ended.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The provider finished normally.
    Completed,
    /// The provider failed; the marker was sent inline.
    Errored(ParleyError),
    /// The caller went away or the turn was cancelled.
    Cancelled,
}

impl TurnOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TurnOutcome::Cancelled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TurnOutcome::Completed => "completed",
            TurnOutcome::Errored(_) => "errored",
            TurnOutcome::Cancelled => "cancelled",
        }
    }
}

/// What the pipeline produced.
#[derive(Debug)]
pub struct PipelineResult {
    /// Accumulated reply text, including the citation line when appended.
    pub text: String,
    pub outcome: TurnOutcome,
    pub usage: TokenUsage,
    /// Number of transport sends made while streaming tokens.
    pub flushes: usize,
    /// Sources whose citation line was appended; empty otherwise.
    pub references: Vec<SearchHit>,
    /// Every state visited, in order.
    pub states: Vec<PipelineState>,
}

/// The citation-marker line appended after a grounded reply.
pub fn citation_line(count: usize) -> String {
    let markers: Vec<String> = (1..=count).map(|n| format!("[{n}]")).collect();
    format!("\n\nSources: {}", markers.join(" "))
}

/// The out-of-band reference payload sent after the citation line.
pub fn ref_data_payload(sources: &[SearchHit]) -> String {
    let data: Vec<serde_json::Value> = sources
        .iter()
        .map(|s| serde_json::json!({ "url": s.url, "title": s.title }))
        .collect();
    let payload = serde_json::json!({ "type": "references", "data": data });
    format!("\n<ref-data>{payload}</ref-data>")
}

/// Inline marker for a provider failure.
pub fn error_marker(error: &ParleyError) -> String {
    format!("\n[ERROR] {}", error.user_message())
}

/// Transport sink that notices a dropped receiver or a cancelled turn.
struct Transport {
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
}

impl Transport {
    /// Sends a chunk; `false` means the turn should stop.
    async fn send(&self, chunk: String) -> bool {
        if chunk.is_empty() {
            return true;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(chunk) => sent.is_ok(),
        }
    }
}

struct Run {
    state: PipelineState,
    states: Vec<PipelineState>,
}

impl Run {
    fn new() -> Self {
        Self {
            state: PipelineState::Starting,
            states: vec![PipelineState::Starting],
        }
    }

    fn enter(&mut self, next: PipelineState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "pipeline state");
            self.state = next;
            self.states.push(next);
        }
    }
}

/// Batches provider tokens onto an mpsc transport.
#[derive(Debug, Clone)]
pub struct StreamingPipeline {
    policy: FlushPolicy,
}

impl StreamingPipeline {
    pub fn new(policy: FlushPolicy) -> Self {
        Self { policy }
    }

    /// Drives `stream` to completion, failure, or cancellation.
    pub async fn run(
        &self,
        mut stream: ProviderStream,
        sources: &[SearchHit],
        tx: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> PipelineResult {
        let transport = Transport { tx, cancel };
        let mut run = Run::new();
        let mut text = String::new();
        let mut pending = String::new();
        let mut token_count = 0usize;
        let mut flushes = 0usize;
        let mut usage = TokenUsage::default();
        let mut failure: Option<ParleyError> = None;

        let cancelled = loop {
            let next = tokio::select! {
                biased;
                _ = transport.cancel.cancelled() => break true,
                _ = transport.tx.closed() => break true,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(ProviderStreamChunk::Text(token))) => {
                    run.enter(PipelineState::Streaming);
                    token_count += 1;
                    text.push_str(&token);
                    pending.push_str(&token);
                    if should_flush(token_count, &token, pending.chars().count(), &self.policy) {
                        flushes += 1;
                        if !transport.send(std::mem::take(&mut pending)).await {
                            break true;
                        }
                    }
                }
                Some(Ok(ProviderStreamChunk::Usage(u))) => usage.merge(u),
                Some(Ok(ProviderStreamChunk::Done { stop_reason })) => {
                    debug!(?stop_reason, tokens = token_count, "provider stream done");
                    break false;
                }
                Some(Err(e)) => {
                    warn!(error = %e, tokens = token_count, "provider stream failed");
                    failure = Some(e);
                    break false;
                }
                None => break false,
            }
        };
        drop(stream);

        if cancelled {
            debug!(tokens = token_count, "turn cancelled, provider stream dropped");
            run.enter(PipelineState::Closed);
            return PipelineResult {
                text,
                outcome: TurnOutcome::Cancelled,
                usage,
                flushes,
                references: Vec::new(),
                states: run.states,
            };
        }

        if !pending.is_empty() {
            flushes += 1;
            if !transport.send(std::mem::take(&mut pending)).await {
                return self.cancelled_after_stream(run, text, usage, flushes);
            }
        }

        if let Some(error) = failure {
            run.enter(PipelineState::Streaming);
            run.enter(PipelineState::Errored);
            // Best effort: the receiver may already be gone.
            transport.send(error_marker(&error)).await;
            run.enter(PipelineState::Closed);
            return PipelineResult {
                text,
                outcome: TurnOutcome::Errored(error),
                usage,
                flushes,
                references: Vec::new(),
                states: run.states,
            };
        }

        let mut references = Vec::new();
        if !sources.is_empty() {
            run.enter(PipelineState::ReferenceAppend);
            let line = citation_line(sources.len());
            if !transport.send(line.clone()).await {
                return self.cancelled_after_stream(run, text, usage, flushes);
            }
            text.push_str(&line);
            if !transport.send(ref_data_payload(sources)).await {
                return self.cancelled_after_stream(run, text, usage, flushes);
            }
            references = sources.to_vec();
        }

        run.enter(PipelineState::Closed);
        PipelineResult {
            text,
            outcome: TurnOutcome::Completed,
            usage,
            flushes,
            references,
            states: run.states,
        }
    }

    fn cancelled_after_stream(
        &self,
        mut run: Run,
        text: String,
        usage: TokenUsage,
        flushes: usize,
    ) -> PipelineResult {
        run.enter(PipelineState::Closed);
        PipelineResult {
            text,
            outcome: TurnOutcome::Cancelled,
            usage,
            flushes,
            references: Vec::new(),
            states: run.states,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use parley_core::GenerationErrorKind;

    fn hit(n: usize) -> SearchHit {
        SearchHit {
            title: format!("Title {n}"),
            url: format!("https://example.com/{n}"),
            content: String::new(),
            source_label: "brave".into(),
            published_at: None,
        }
    }

    fn token_stream(tokens: &[&str]) -> ProviderStream {
        let chunks: Vec<Result<ProviderStreamChunk, ParleyError>> = tokens
            .iter()
            .map(|t| Ok(ProviderStreamChunk::Text(t.to_string())))
            .chain([Ok(ProviderStreamChunk::Done {
                stop_reason: Some("end_turn".into()),
            })])
            .collect();
        Box::pin(stream::iter(chunks))
    }

    async fn drain(mut rx: mpsc::Receiver<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk);
        }
        chunks
    }

    #[tokio::test]
    async fn many_unpunctuated_tokens_are_batched() {
        let tokens: Vec<String> = (0..47).map(|i| format!("w{i} ")).collect();
        let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
        let (tx, rx) = mpsc::channel(128);

        let result = StreamingPipeline::new(FlushPolicy::default())
            .run(token_stream(&refs), &[], tx, CancellationToken::new())
            .await;
        let chunks = drain(rx).await;

        assert!(result.flushes >= 5, "got {} flushes", result.flushes);
        assert_eq!(result.text, tokens.concat());
        assert_eq!(chunks.concat(), result.text);
        assert!(matches!(result.outcome, TurnOutcome::Completed));
        assert_eq!(
            result.states,
            vec![
                PipelineState::Starting,
                PipelineState::Streaming,
                PipelineState::Closed
            ]
        );
    }

    #[tokio::test]
    async fn references_follow_citation_line() {
        let (tx, rx) = mpsc::channel(16);
        let sources = vec![hit(1), hit(2)];
        let result = StreamingPipeline::new(FlushPolicy::default())
            .run(token_stream(&["Sunny ", "[1]."]), &sources, tx, CancellationToken::new())
            .await;
        let chunks = drain(rx).await;

        assert_eq!(result.text, "Sunny [1].\n\nSources: [1] [2]");
        assert_eq!(result.references.len(), 2);
        let last = chunks.last().unwrap();
        assert!(last.starts_with("\n<ref-data>"));
        assert!(last.ends_with("</ref-data>"));
        let json = &last["\n<ref-data>".len()..last.len() - "</ref-data>".len()];
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(value["type"], "references");
        assert_eq!(value["data"][1]["url"], "https://example.com/2");
        assert!(!result.text.contains("ref-data"));
        assert!(result.states.contains(&PipelineState::ReferenceAppend));
    }

    #[tokio::test]
    async fn mid_stream_error_keeps_sent_text_and_marks_inline() {
        let chunks: Vec<Result<ProviderStreamChunk, ParleyError>> = vec![
            Ok(ProviderStreamChunk::Text("Partial ".into())),
            Ok(ProviderStreamChunk::Text("answer".into())),
            Ok(ProviderStreamChunk::Text(" then".into())),
            Err(ParleyError::generation(
                GenerationErrorKind::ServerError,
                "upstream overloaded",
            )),
        ];
        let (tx, rx) = mpsc::channel(16);
        let result = StreamingPipeline::new(FlushPolicy::default())
            .run(Box::pin(stream::iter(chunks)), &[hit(1)], tx, CancellationToken::new())
            .await;
        let sent = drain(rx).await.concat();

        assert_eq!(sent, "Partial answer then\n[ERROR] upstream overloaded");
        assert_eq!(result.text, "Partial answer then");
        assert!(result.references.is_empty());
        assert!(matches!(result.outcome, TurnOutcome::Errored(_)));
        assert_eq!(
            &result.states[result.states.len() - 2..],
            &[PipelineState::Errored, PipelineState::Closed]
        );
    }

    #[tokio::test]
    async fn error_before_first_token() {
        let chunks: Vec<Result<ProviderStreamChunk, ParleyError>> = vec![Err(
            ParleyError::generation(GenerationErrorKind::InsufficientBalance, "credit exhausted"),
        )];
        let (tx, rx) = mpsc::channel(4);
        let result = StreamingPipeline::new(FlushPolicy::default())
            .run(Box::pin(stream::iter(chunks)), &[], tx, CancellationToken::new())
            .await;
        assert_eq!(drain(rx).await.concat(), "\n[ERROR] credit exhausted");
        assert!(result.text.is_empty());
        assert_eq!(
            result.states,
            vec![
                PipelineState::Starting,
                PipelineState::Streaming,
                PipelineState::Errored,
                PipelineState::Closed
            ]
        );
    }

    #[tokio::test]
    async fn cancellation_stops_consumption() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, rx) = mpsc::channel(4);
        let result = StreamingPipeline::new(FlushPolicy::default())
            .run(token_stream(&["a ", "b "]), &[hit(1)], tx, cancel)
            .await;
        assert!(result.outcome.is_cancelled());
        assert!(drain(rx).await.is_empty());
    }

    #[tokio::test]
    async fn dropped_receiver_cancels() {
        let tokens: Vec<String> = (0..20).map(|i| format!("t{i} ")).collect();
        let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let result = StreamingPipeline::new(FlushPolicy::default())
            .run(token_stream(&refs), &[], tx, CancellationToken::new())
            .await;
        assert!(result.outcome.is_cancelled());
        assert_eq!(result.outcome.label(), "cancelled");
    }
}
