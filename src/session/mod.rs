//! Conversation session persistence
//!
//! This module owns the durable side of the pipeline: the conversation
//! and message records and the embedded store that holds them.

pub mod store;
pub mod types;

pub use store::{Partition, SessionStore, RECENT_LIMIT};
pub use types::{new_conversation_id, new_session_id, Conversation, Message, TITLE_MAX_CHARS};
