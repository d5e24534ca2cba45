// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable recording of a finished turn plus its background follow-ups.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use parley_core::types::{Conversation, ConversationPatch, Message, Reference, Role, SearchHit};
use parley_memory::MemoryExtractor;
use parley_storage::PersistenceGateway;

use crate::title::TitleWriter;

/// Records written for one turn.
#[derive(Debug, Clone)]
pub struct PersistedTurn {
    pub user_message: Message,
    pub assistant_message: Option<Message>,
    pub references: Vec<Reference>,
}

/// The conversation a turn belongs to.
///
/// A conversation opened by the turn itself is only written together with
/// the turn's first message, so a turn that never persists leaves nothing
/// behind.
#[derive(Debug, Clone)]
pub struct ConversationTarget {
    pub conversation: Conversation,
    pub is_new: bool,
}

impl ConversationTarget {
    pub fn existing(conversation: Conversation) -> Self {
        Self {
            conversation,
            is_new: false,
        }
    }

    /// A conversation allocated for this turn but not yet stored.
    pub fn opened(conversation: Conversation) -> Self {
        Self {
            conversation,
            is_new: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.conversation.id
    }

    pub fn owner(&self) -> &str {
        &self.conversation.owner_user_id
    }
}

/// Background work to run once a turn is stored.
#[derive(Debug, Clone)]
pub struct FollowUp {
    pub user_id: String,
    pub conversation_id: String,
    /// Set when the conversation was created by this turn.
    pub retitle_from: Option<String>,
    pub user_text: String,
    pub assistant_text: String,
}

/// Writes turn messages and schedules extraction and title rewrites.
pub struct TurnPersistence {
    gateway: Arc<PersistenceGateway>,
    extractor: Option<Arc<MemoryExtractor>>,
    titles: Option<Arc<TitleWriter>>,
    tracker: TaskTracker,
    fallback_reply: String,
}

impl TurnPersistence {
    pub fn new(
        gateway: Arc<PersistenceGateway>,
        extractor: Option<Arc<MemoryExtractor>>,
        titles: Option<Arc<TitleWriter>>,
        tracker: TaskTracker,
        fallback_reply: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            extractor,
            titles,
            tracker,
            fallback_reply: fallback_reply.into(),
        }
    }

    /// Writes the user message, then the assistant message, then references.
    ///
    /// An empty reply is stored as the fallback apology. References are
    /// numbered 0..N-1 in `sources` order.
    pub async fn record_exchange(
        &self,
        target: &ConversationTarget,
        user_text: &str,
        assistant_text: &str,
        sources: &[SearchHit],
    ) -> PersistedTurn {
        self.open(target).await;
        let conversation_id = target.id();
        let user_message = self
            .gateway
            .create_message(conversation_id, Role::User, user_text)
            .await;

        let content = if assistant_text.trim().is_empty() {
            self.fallback_reply.as_str()
        } else {
            assistant_text
        };
        let assistant_message = self
            .gateway
            .create_message(conversation_id, Role::Assistant, content)
            .await;

        let references = if sources.is_empty() {
            Vec::new()
        } else {
            self.gateway
                .create_references(&assistant_message.id, sources)
                .await
        };

        self.touch(conversation_id).await;
        info!(
            conversation_id,
            message_id = %assistant_message.id,
            references = references.len(),
            "turn persisted"
        );
        PersistedTurn {
            user_message,
            assistant_message: Some(assistant_message),
            references,
        }
    }

    /// Writes only the user message, for turns whose generation failed.
    pub async fn record_user_only(
        &self,
        target: &ConversationTarget,
        user_text: &str,
    ) -> PersistedTurn {
        self.open(target).await;
        let conversation_id = target.id();
        let user_message = self
            .gateway
            .create_message(conversation_id, Role::User, user_text)
            .await;
        self.touch(conversation_id).await;
        debug!(conversation_id, "user message persisted without reply");
        PersistedTurn {
            user_message,
            assistant_message: None,
            references: Vec::new(),
        }
    }

    /// Stores a conversation opened by this turn before any of its messages.
    async fn open(&self, target: &ConversationTarget) {
        if target.is_new {
            let conversation = self
                .gateway
                .store_conversation(target.conversation.clone())
                .await;
            info!(
                conversation_id = %conversation.id,
                user_id = %conversation.owner_user_id,
                "conversation created"
            );
        }
    }

    async fn touch(&self, conversation_id: &str) {
        if self
            .gateway
            .update_conversation(conversation_id, &ConversationPatch::default())
            .await
            .is_none()
        {
            warn!(conversation_id, "conversation vanished while persisting turn");
        }
    }

    /// Runs the title rewrite and memory extraction on the background
    /// tracker. Failures are logged and dropped.
    pub fn schedule_followups(&self, follow_up: FollowUp) {
        let titles = follow_up.retitle_from.as_ref().and(self.titles.clone());
        let extractor = if follow_up.assistant_text.trim().is_empty() {
            None
        } else {
            self.extractor.clone()
        };
        if titles.is_none() && extractor.is_none() {
            return;
        }

        let gateway = Arc::clone(&self.gateway);
        self.tracker.spawn(async move {
            if let (Some(titles), Some(first)) = (titles, follow_up.retitle_from.as_deref()) {
                match titles.write_title(first).await {
                    Ok(Some(title)) => {
                        let patch = ConversationPatch { title: Some(title) };
                        gateway
                            .update_conversation(&follow_up.conversation_id, &patch)
                            .await;
                        debug!(conversation_id = %follow_up.conversation_id, "conversation retitled");
                    }
                    Ok(None) => debug!("title model returned nothing usable"),
                    Err(e) => warn!(error = %e, "title rewrite failed"),
                }
            }

            if let Some(extractor) = extractor {
                if let Err(e) = extractor
                    .extract_from_turn(
                        &follow_up.user_id,
                        &follow_up.user_text,
                        &follow_up.assistant_text,
                    )
                    .await
                {
                    warn!(user_id = %follow_up.user_id, error = %e, "memory extraction failed");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::GenerationErrorKind;
    use parley_test_utils::{MockProvider, MockReply, sample_hits};

    const APOLOGY: &str = "Sorry, no reply this time.";

    fn persistence(
        gateway: Arc<PersistenceGateway>,
        utility: Arc<MockProvider>,
        tracker: TaskTracker,
    ) -> TurnPersistence {
        TurnPersistence::new(
            gateway.clone(),
            Some(Arc::new(MemoryExtractor::new(gateway, utility.clone(), "utility"))),
            Some(Arc::new(TitleWriter::new(utility, "utility"))),
            tracker,
            APOLOGY,
        )
    }

    #[tokio::test]
    async fn exchange_writes_user_before_assistant_with_references() {
        let gateway = Arc::new(PersistenceGateway::in_memory());
        let conv = gateway.create_conversation("usr_1", "New chat").await;
        let p = persistence(gateway.clone(), Arc::new(MockProvider::new()), TaskTracker::new());

        let turn = p
            .record_exchange(
                &ConversationTarget::existing(conv.clone()),
                "weather?",
                "Sunny [1].",
                &sample_hits("brave", 3),
            )
            .await;

        let messages = gateway.list_messages(&conv.id).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        let orders: Vec<u32> = turn.references.iter().map(|r| r.display_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        let stored = gateway
            .list_references(&turn.assistant_message.unwrap().id)
            .await;
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn empty_reply_stores_apology() {
        let gateway = Arc::new(PersistenceGateway::in_memory());
        let conv = gateway.create_conversation("usr_1", "New chat").await;
        let p = persistence(gateway.clone(), Arc::new(MockProvider::new()), TaskTracker::new());

        let target = ConversationTarget::existing(conv);
        let turn = p.record_exchange(&target, "hello", "  ", &[]).await;
        assert_eq!(turn.assistant_message.unwrap().content, APOLOGY);
        assert!(turn.references.is_empty());
    }

    #[tokio::test]
    async fn opened_conversation_is_stored_with_first_message() {
        let gateway = Arc::new(PersistenceGateway::in_memory());
        let p = persistence(gateway.clone(), Arc::new(MockProvider::new()), TaskTracker::new());
        let target = ConversationTarget::opened(Conversation::new("usr_1", "hello"));
        assert!(gateway.list_conversations("usr_1").await.is_empty());

        p.record_user_only(&target, "hello").await;

        let stored = gateway.find_conversation(target.id()).await.unwrap();
        assert_eq!(stored.owner_user_id, "usr_1");
        assert_eq!(gateway.list_messages(target.id()).await.len(), 1);
        assert_eq!(gateway.list_conversations("usr_1").await.len(), 1);
    }

    #[tokio::test]
    async fn followups_retitle_then_extract() {
        let gateway = Arc::new(PersistenceGateway::in_memory());
        let conv = gateway.create_conversation("usr_1", "Plan a trip").await;
        let utility = Arc::new(MockProvider::with_responses(vec![
            "Trip Planning".into(),
            r#"[{"content": "User is travelling to Japan", "category": "project", "importance": 6}]"#
                .into(),
        ]));
        let tracker = TaskTracker::new();
        let p = persistence(gateway.clone(), utility, tracker.clone());

        p.schedule_followups(FollowUp {
            user_id: "usr_1".into(),
            conversation_id: conv.id.clone(),
            retitle_from: Some("Plan a trip to Japan".into()),
            user_text: "Plan a trip to Japan".into(),
            assistant_text: "Sure!".into(),
        });
        tracker.close();
        tracker.wait().await;

        let conv = gateway.find_conversation(&conv.id).await.unwrap();
        assert_eq!(conv.title, "Trip Planning");
        assert_eq!(gateway.list_memories("usr_1").await.len(), 1);
    }

    #[tokio::test]
    async fn failing_followups_are_swallowed() {
        let gateway = Arc::new(PersistenceGateway::in_memory());
        let conv = gateway.create_conversation("usr_1", "Original").await;
        let utility = Arc::new(MockProvider::with_replies(vec![
            MockReply::fail(GenerationErrorKind::ServerError, "down"),
            MockReply::fail(GenerationErrorKind::ServerError, "down"),
        ]));
        let tracker = TaskTracker::new();
        let p = persistence(gateway.clone(), utility, tracker.clone());

        p.schedule_followups(FollowUp {
            user_id: "usr_1".into(),
            conversation_id: conv.id.clone(),
            retitle_from: Some("Original".into()),
            user_text: "hi".into(),
            assistant_text: "hello".into(),
        });
        tracker.close();
        tracker.wait().await;

        assert_eq!(gateway.find_conversation(&conv.id).await.unwrap().title, "Original");
        assert!(gateway.list_memories("usr_1").await.is_empty());
    }
}
