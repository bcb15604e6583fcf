//! Conversation and message records
//!
//! These are the entities persisted by the session store. A conversation
//! owns a strictly insertion-ordered message sequence; messages are never
//! reordered or mutated after append.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use uuid::Uuid;

/// Number of characters of the originating user message used for the title.
pub const TITLE_MAX_CHARS: usize = 50;

/// A single message within a conversation
///
/// Messages carry an optional confidence score and source list when the
/// gateway returns them alongside an assistant reply; both pass through
/// unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender ("user" or "assistant")
    pub role: String,

    /// Content of the message
    pub content: String,

    /// When the message was appended
    pub timestamp: DateTime<Utc>,

    /// Optional confidence reported by the inference backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Optional source titles reported by the inference backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Arguments
    ///
    /// * `content` - The message content
    ///
    /// # Examples
    ///
    /// ```
    /// use mitra::session::Message;
    ///
    /// let msg = Message::user("Hello, assistant!");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            timestamp: Utc::now(),
            confidence: None,
            sources: None,
        }
    }

    /// Creates a new assistant message
    ///
    /// # Arguments
    ///
    /// * `content` - The message content
    /// * `confidence` - Optional confidence reported by the backend
    /// * `sources` - Optional source titles reported by the backend
    ///
    /// # Examples
    ///
    /// ```
    /// use mitra::session::Message;
    ///
    /// let msg = Message::assistant("Hello, user!", Some(0.9), None);
    /// assert_eq!(msg.role, "assistant");
    /// assert_eq!(msg.confidence, Some(0.9));
    /// ```
    pub fn assistant(
        content: impl Into<String>,
        confidence: Option<f64>,
        sources: Option<Vec<String>>,
    ) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            timestamp: Utc::now(),
            confidence,
            sources,
        }
    }
}

/// A persisted conversation
///
/// `id` is assigned at creation and immutable. `session_id` is the opaque
/// identifier sent with every turn so the backend can keep its own
/// server-side context; it is generated once per conversation and stays
/// stable for all turns. Older stored records may lack one, in which case
/// loading the conversation regenerates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier (ULID)
    pub id: String,

    /// Title derived from the first user message; empty until the first
    /// turn completes
    #[serde(default)]
    pub title: String,

    /// Ordered message sequence
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last successful turn
    pub updated_at: DateTime<Utc>,

    /// Whether the user starred this conversation
    #[serde(default)]
    pub starred: bool,

    /// Whether the user pinned this conversation above the recent list
    #[serde(default)]
    pub pinned: bool,

    /// Preview text shown in list views
    #[serde(default)]
    pub last_message: String,

    /// Opaque session identifier for the inference backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Conversation {
    /// Creates a new empty conversation with a fresh id and session id
    ///
    /// # Examples
    ///
    /// ```
    /// use mitra::session::Conversation;
    ///
    /// let conversation = Conversation::new();
    /// assert!(conversation.title.is_empty());
    /// assert!(conversation.messages.is_empty());
    /// assert!(conversation.session_id.is_some());
    /// ```
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: new_conversation_id(),
            title: String::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            starred: false,
            pinned: false,
            last_message: String::new(),
            session_id: Some(new_session_id()),
        }
    }

    /// Derives the conversation title from its originating user message
    ///
    /// The title is the first [`TITLE_MAX_CHARS`] characters of the text,
    /// suffixed with an ellipsis only when truncation occurred.
    ///
    /// # Examples
    ///
    /// ```
    /// use mitra::session::Conversation;
    ///
    /// assert_eq!(Conversation::derive_title("5+5"), "5+5");
    /// let long = "x".repeat(60);
    /// assert_eq!(Conversation::derive_title(&long).len(), 53);
    /// ```
    pub fn derive_title(user_text: &str) -> String {
        let mut title: String = user_text.chars().take(TITLE_MAX_CHARS).collect();
        if user_text.chars().count() > TITLE_MAX_CHARS {
            title.push_str("...");
        }
        title
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a new ULID for a conversation
///
/// ULIDs are preferred over UUIDs for conversation ids as they are
/// sortable by creation time and more human-readable.
pub fn new_conversation_id() -> String {
    Ulid::new().to_string()
}

/// Generate a new opaque session id for the inference backend
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}
