//! Turn orchestration over the active conversation
//!
//! The engine owns the in-memory conversation state, validates and
//! appends outgoing messages, drives the gateway call for a turn, and
//! persists the conversation after every successful turn. It never
//! touches presentation: state changes surface through return values
//! and accessors only.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{MitraError, Result};
use crate::format::{format_message, Node};
use crate::gateway::Gateway;
use crate::session::{new_session_id, Conversation, Message, SessionStore};

/// Turn lifecycle state
///
/// A turn moves `Idle → Sending → AwaitingReply → Idle` on success and
/// falls back to `Idle` on failure with the optimistic user message
/// preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// No turn in flight
    Idle,
    /// The user message was appended and the gateway call is starting
    Sending,
    /// The gateway answered; the reply is being applied
    AwaitingReply,
}

/// The result of one successful turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The appended assistant message
    pub reply: Message,
    /// The reply rendered to structured nodes for presentation
    pub rendered: Vec<Node>,
}

/// Orchestrates turns for one active conversation at a time
///
/// Constructed once and handed its collaborators explicitly; nothing
/// here reaches for shared global state. One turn per conversation at a
/// time is structural: `send_message` takes `&mut self` and holds the
/// exclusive borrow across the gateway await, so a second send cannot
/// start before settlement and the active conversation cannot change
/// while a request is outstanding.
pub struct ConversationEngine {
    gateway: Arc<dyn Gateway>,
    store: Arc<SessionStore>,
    max_message_length: usize,
    conversation: Conversation,
    state: TurnState,
}

impl ConversationEngine {
    /// Create an engine with a fresh empty conversation active
    ///
    /// # Arguments
    ///
    /// * `gateway` - Network boundary for turns
    /// * `store` - Durable conversation repository
    /// * `max_message_length` - Outgoing message cap in characters
    pub fn new(
        gateway: Arc<dyn Gateway>,
        store: Arc<SessionStore>,
        max_message_length: usize,
    ) -> Self {
        Self {
            gateway,
            store,
            max_message_length,
            conversation: Conversation::new(),
            state: TurnState::Idle,
        }
    }

    /// The active conversation
    pub fn active(&self) -> &Conversation {
        &self.conversation
    }

    /// Messages of the active conversation, in insertion order
    pub fn messages(&self) -> &[Message] {
        &self.conversation.messages
    }

    /// Current turn state
    pub fn turn_state(&self) -> TurnState {
        self.state
    }

    /// Create and activate a new empty conversation
    ///
    /// The new conversation gets a fresh id and session id and replaces
    /// the in-memory message buffer. Nothing is persisted until its
    /// first turn completes.
    pub fn start_new_conversation(&mut self) {
        self.conversation = Conversation::new();
        self.state = TurnState::Idle;
        tracing::debug!("Started conversation {}", self.conversation.id);
    }

    /// Replace the active conversation with a stored one
    ///
    /// A missing id is a silent no-op: the active conversation is kept.
    /// A stored record without a session id gets a fresh one; records
    /// that already carry one keep it, so the backend session stays
    /// stable across loads.
    ///
    /// # Returns
    ///
    /// Returns true when the conversation was found and activated
    pub fn load_conversation(&mut self, id: &str) -> Result<bool> {
        let Some(mut conversation) = self.store.get(id)? else {
            tracing::debug!("Conversation {} not found, keeping active one", id);
            return Ok(false);
        };

        if conversation.session_id.is_none() {
            conversation.session_id = Some(new_session_id());
        }

        self.conversation = conversation;
        self.state = TurnState::Idle;
        Ok(true)
    }

    /// Send one user message and apply the assistant reply
    ///
    /// The user message is appended optimistically before the network
    /// call. On success the reply is formatted, appended with its
    /// confidence/sources metadata, the title and preview are derived,
    /// and the conversation is persisted. On failure the user message
    /// is **not** rolled back, no retry is attempted, and the error is
    /// returned for user-visible reporting.
    ///
    /// # Arguments
    ///
    /// * `text` - The outgoing message text
    ///
    /// # Errors
    ///
    /// Returns `MitraError::Validation` when `text` is empty after
    /// trimming or exceeds the configured maximum length (no state
    /// change), or `MitraError::Network` when the gateway call fails
    pub async fn send_message(&mut self, text: &str) -> Result<TurnOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MitraError::Validation("message is empty".to_string()).into());
        }
        if text.chars().count() > self.max_message_length {
            return Err(MitraError::Validation(format!(
                "message exceeds {} characters",
                self.max_message_length
            ))
            .into());
        }

        let session_id = self
            .conversation
            .session_id
            .get_or_insert_with(new_session_id)
            .clone();

        self.conversation.messages.push(Message::user(text));
        self.state = TurnState::Sending;

        let reply = match self.gateway.send_message(text, &session_id).await {
            Ok(reply) => reply,
            Err(e) => {
                // The optimistic user message stays; only the turn dies.
                self.state = TurnState::Idle;
                tracing::warn!("Turn failed for conversation {}: {}", self.conversation.id, e);
                return Err(e);
            }
        };
        self.state = TurnState::AwaitingReply;

        let rendered = format_message(&reply.response);
        let message = Message::assistant(&reply.response, reply.confidence, reply.sources);
        self.conversation.messages.push(message.clone());

        let persisted = self.update_conversation(text, &reply.response);
        self.state = TurnState::Idle;
        persisted?;

        Ok(TurnOutcome {
            reply: message,
            rendered,
        })
    }

    /// Apply the post-turn bookkeeping rules and persist
    ///
    /// The title is set exactly once, when the message count first
    /// reaches two (the first completed turn), derived from the
    /// originating user message. `updated_at` is refreshed here and
    /// only here.
    fn update_conversation(&mut self, user_text: &str, ai_text: &str) -> Result<()> {
        if self.conversation.messages.len() == 2 && self.conversation.title.is_empty() {
            self.conversation.title = Conversation::derive_title(user_text);
        }

        self.conversation.last_message = ai_text.to_string();
        self.conversation.updated_at = Utc::now();

        self.store.save(&self.conversation)
    }

    /// Toggle the pinned flag of a stored conversation
    ///
    /// # Returns
    ///
    /// Returns the new flag value, or None when the id is unknown
    pub fn toggle_pinned(&mut self, id: &str) -> Result<Option<bool>> {
        self.toggle_flag(id, |c| {
            c.pinned = !c.pinned;
            c.pinned
        })
    }

    /// Toggle the starred flag of a stored conversation
    pub fn toggle_starred(&mut self, id: &str) -> Result<Option<bool>> {
        self.toggle_flag(id, |c| {
            c.starred = !c.starred;
            c.starred
        })
    }

    fn toggle_flag(
        &mut self,
        id: &str,
        apply: impl Fn(&mut Conversation) -> bool,
    ) -> Result<Option<bool>> {
        let Some(mut conversation) = self.store.get(id)? else {
            return Ok(None);
        };

        let value = apply(&mut conversation);
        self.store.save(&conversation)?;

        if self.conversation.id == id {
            apply(&mut self.conversation);
        }

        Ok(Some(value))
    }

    /// Permanently remove a conversation from the store
    ///
    /// The only destructive operation. Deleting the active conversation
    /// activates a fresh empty one.
    pub fn delete_conversation(&mut self, id: &str) -> Result<()> {
        self.store.remove(id)?;

        if self.conversation.id == id {
            self.start_new_conversation();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{AuthGrant, ChatReply, HealthStatus, UploadAck};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;

    /// In-memory gateway that replays queued replies and records calls.
    struct FakeGateway {
        replies: Mutex<VecDeque<ChatReply>>,
        calls: Mutex<Vec<(String, String)>>,
        fail_with: Option<String>,
    }

    impl FakeGateway {
        fn with_replies(replies: Vec<ChatReply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
                fail_with: None,
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                replies: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
                fail_with: Some(message.to_string()),
            }
        }

        fn reply(text: &str) -> ChatReply {
            ChatReply {
                response: text.to_string(),
                confidence: None,
                sources: None,
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Gateway for FakeGateway {
        async fn send_message(&self, text: &str, session_id: &str) -> Result<ChatReply> {
            self.calls
                .lock()
                .unwrap()
                .push((text.to_string(), session_id.to_string()));

            if let Some(message) = &self.fail_with {
                return Err(MitraError::Network(message.clone()).into());
            }

            Ok(self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Self::reply("fallback")))
        }

        async fn login(&self, _email: &str, _password: &str) -> Result<AuthGrant> {
            unimplemented!("not used by engine tests")
        }

        async fn register(
            &self,
            _email: &str,
            _username: &str,
            _password: &str,
        ) -> Result<AuthGrant> {
            unimplemented!("not used by engine tests")
        }

        async fn check_health(&self) -> Result<HealthStatus> {
            unimplemented!("not used by engine tests")
        }

        async fn upload_document(
            &self,
            _path: &Path,
            _session_id: Option<&str>,
        ) -> Result<UploadAck> {
            unimplemented!("not used by engine tests")
        }
    }

    fn engine_with(gateway: FakeGateway) -> (tempfile::TempDir, Arc<FakeGateway>, ConversationEngine) {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SessionStore::new_with_path(temp_dir.path().join("test.db")).expect("Failed to open"),
        );
        let gateway = Arc::new(gateway);
        let engine = ConversationEngine::new(gateway.clone(), store, 4000);
        (temp_dir, gateway, engine)
    }

    #[tokio::test]
    async fn test_send_empty_message_is_rejected_without_state_change() {
        let (_dir, _gw, mut engine) = engine_with(FakeGateway::with_replies(vec![]));

        let err = engine.send_message("   ").await.unwrap_err();
        assert!(err.to_string().contains("Validation"));
        assert!(engine.messages().is_empty());
        assert_eq!(engine.turn_state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_send_oversize_message_is_rejected() {
        let (_dir, gw, mut engine) = engine_with(FakeGateway::with_replies(vec![]));

        let text = "x".repeat(4001);
        let err = engine.send_message(&text).await.unwrap_err();
        assert!(err.to_string().contains("4000"));
        assert!(engine.messages().is_empty());
        assert!(gw.calls().is_empty(), "rejected before any network call");
    }

    #[tokio::test]
    async fn test_successful_turn_appends_both_messages() {
        let (_dir, _gw, mut engine) =
            engine_with(FakeGateway::with_replies(vec![FakeGateway::reply("10")]));

        let outcome = engine.send_message("5+5").await.unwrap();

        assert_eq!(outcome.reply.content, "10");
        assert_eq!(engine.messages().len(), 2);
        assert_eq!(engine.messages()[0].role, "user");
        assert_eq!(engine.messages()[0].content, "5+5");
        assert_eq!(engine.messages()[1].role, "assistant");
        assert_eq!(engine.turn_state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_first_turn_derives_title_and_persists() {
        let (_dir, _gw, mut engine) =
            engine_with(FakeGateway::with_replies(vec![FakeGateway::reply("10")]));

        engine.send_message("5+5").await.unwrap();

        let active = engine.active();
        assert_eq!(active.title, "5+5");
        assert_eq!(active.last_message, "10");
        assert!(active.updated_at > active.created_at);

        let stored = engine.store.get(&active.id).unwrap().expect("persisted");
        assert_eq!(stored.title, "5+5");
        assert_eq!(stored.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_title_is_set_exactly_once() {
        let (_dir, _gw, mut engine) = engine_with(FakeGateway::with_replies(vec![
            FakeGateway::reply("first"),
            FakeGateway::reply("second"),
        ]));

        engine.send_message("the original question").await.unwrap();
        engine.send_message("a different follow-up").await.unwrap();

        assert_eq!(engine.active().title, "the original question");
        assert_eq!(engine.active().last_message, "second");
    }

    #[tokio::test]
    async fn test_long_first_message_title_is_truncated() {
        let (_dir, _gw, mut engine) =
            engine_with(FakeGateway::with_replies(vec![FakeGateway::reply("ok")]));

        let text = "q".repeat(60);
        engine.send_message(&text).await.unwrap();

        assert_eq!(engine.active().title, format!("{}...", "q".repeat(50)));
    }

    #[tokio::test]
    async fn test_failed_turn_keeps_user_message_and_skips_persistence() {
        let (_dir, _gw, mut engine) = engine_with(FakeGateway::failing("connection refused"));

        let err = engine.send_message("hello?").await.unwrap_err();

        assert!(err.to_string().contains("Network"));
        assert_eq!(engine.messages().len(), 1);
        assert_eq!(engine.messages()[0].content, "hello?");
        assert_eq!(engine.turn_state(), TurnState::Idle);
        assert!(engine.store.get(&engine.active().id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_id_is_stable_across_turns() {
        let (_dir, gw, mut engine) = engine_with(FakeGateway::with_replies(vec![
            FakeGateway::reply("a"),
            FakeGateway::reply("b"),
        ]));

        engine.send_message("one").await.unwrap();
        engine.send_message("two").await.unwrap();

        let calls = gw.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, calls[1].1);
        assert_eq!(engine.active().session_id.as_deref(), Some(calls[0].1.as_str()));
    }

    #[tokio::test]
    async fn test_new_conversation_gets_fresh_ids() {
        let (_dir, _gw, mut engine) =
            engine_with(FakeGateway::with_replies(vec![FakeGateway::reply("a")]));

        engine.send_message("one").await.unwrap();
        let old_id = engine.active().id.clone();
        let old_session = engine.active().session_id.clone();

        engine.start_new_conversation();

        assert_ne!(engine.active().id, old_id);
        assert_ne!(engine.active().session_id, old_session);
        assert!(engine.messages().is_empty());
        assert!(engine.active().title.is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_conversation_is_noop() {
        let (_dir, _gw, mut engine) = engine_with(FakeGateway::with_replies(vec![]));

        let active_id = engine.active().id.clone();
        let loaded = engine.load_conversation("no-such-id").unwrap();

        assert!(!loaded);
        assert_eq!(engine.active().id, active_id);
    }

    #[tokio::test]
    async fn test_load_conversation_replaces_buffer() {
        let (_dir, _gw, mut engine) =
            engine_with(FakeGateway::with_replies(vec![FakeGateway::reply("10")]));

        engine.send_message("5+5").await.unwrap();
        let saved_id = engine.active().id.clone();

        engine.start_new_conversation();
        assert!(engine.messages().is_empty());

        assert!(engine.load_conversation(&saved_id).unwrap());
        assert_eq!(engine.active().id, saved_id);
        assert_eq!(engine.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_load_regenerates_missing_session_id_only() {
        let (_dir, _gw, mut engine) = engine_with(FakeGateway::with_replies(vec![]));

        let mut record = Conversation::new();
        record.session_id = None;
        engine.store.save(&record).unwrap();

        engine.load_conversation(&record.id).unwrap();
        assert!(engine.active().session_id.is_some());

        // A record that already carries a session id keeps it.
        let with_session = Conversation::new();
        let original = with_session.session_id.clone();
        engine.store.save(&with_session).unwrap();
        engine.load_conversation(&with_session.id).unwrap();
        assert_eq!(engine.active().session_id, original);
    }

    #[tokio::test]
    async fn test_reply_metadata_is_carried() {
        let reply = ChatReply {
            response: "from the handbook".to_string(),
            confidence: Some(0.87),
            sources: Some(vec!["Handbook".to_string(), "FAQ".to_string()]),
        };
        let (_dir, _gw, mut engine) = engine_with(FakeGateway::with_replies(vec![reply]));

        let outcome = engine.send_message("what?").await.unwrap();

        assert_eq!(outcome.reply.confidence, Some(0.87));
        assert_eq!(
            outcome.reply.sources,
            Some(vec!["Handbook".to_string(), "FAQ".to_string()])
        );
    }

    #[tokio::test]
    async fn test_reply_is_rendered_to_nodes() {
        let (_dir, _gw, mut engine) = engine_with(FakeGateway::with_replies(vec![
            FakeGateway::reply("**sum** is `10`"),
        ]));

        let outcome = engine.send_message("5+5").await.unwrap();

        assert_eq!(
            outcome.rendered,
            vec![
                Node::Bold("sum".to_string()),
                Node::Text(" is ".to_string()),
                Node::InlineCode("10".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_toggle_pinned_and_starred() {
        let (_dir, _gw, mut engine) =
            engine_with(FakeGateway::with_replies(vec![FakeGateway::reply("a")]));

        engine.send_message("one").await.unwrap();
        let id = engine.active().id.clone();

        assert_eq!(engine.toggle_pinned(&id).unwrap(), Some(true));
        assert!(engine.active().pinned);
        assert_eq!(engine.toggle_pinned(&id).unwrap(), Some(false));

        assert_eq!(engine.toggle_starred(&id).unwrap(), Some(true));
        assert!(engine.store.get(&id).unwrap().unwrap().starred);

        assert_eq!(engine.toggle_pinned("missing").unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_active_conversation_starts_fresh() {
        let (_dir, _gw, mut engine) =
            engine_with(FakeGateway::with_replies(vec![FakeGateway::reply("a")]));

        engine.send_message("one").await.unwrap();
        let id = engine.active().id.clone();

        engine.delete_conversation(&id).unwrap();

        assert!(engine.store.get(&id).unwrap().is_none());
        assert_ne!(engine.active().id, id);
        assert!(engine.messages().is_empty());
    }

    #[tokio::test]
    async fn test_trimmed_text_is_sent_and_stored() {
        let (_dir, gw, mut engine) =
            engine_with(FakeGateway::with_replies(vec![FakeGateway::reply("ok")]));

        engine.send_message("  padded  ").await.unwrap();

        assert_eq!(engine.messages()[0].content, "padded");
        assert_eq!(gw.calls()[0].0, "padded");
        assert_eq!(engine.active().title, "padded");
    }
}
