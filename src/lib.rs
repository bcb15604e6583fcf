//! Mitra - conversational AI client library
//!
//! This library provides the core functionality for the Mitra client:
//! conversation/session identity, durable client-side history, the
//! send/receive turn lifecycle against a remote inference gateway, and
//! the transformation of raw assistant text into renderable nodes.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `engine`: turn orchestration and in-memory conversation state
//! - `session`: conversation records and the durable store
//! - `format`: assistant text to renderable node transformation
//! - `auth`: access-token lifecycle and access gating
//! - `gateway`: the HTTP contract to the chat/auth/document endpoints
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli`: command-line interface definition
//!
//! Services are constructed once and passed explicitly to consumers;
//! nothing is reached through ambient global lookup.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mitra::config::Config;
//! use mitra::engine::ConversationEngine;
//! use mitra::gateway::HttpGateway;
//! use mitra::session::SessionStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let store = Arc::new(SessionStore::new()?);
//!     let gateway = Arc::new(HttpGateway::new(&config.gateway)?);
//!
//!     let mut engine =
//!         ConversationEngine::new(gateway, store, config.chat.max_message_length);
//!     let outcome = engine.send_message("5+5").await?;
//!     println!("{}", outcome.reply.content);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod gateway;
pub mod session;

// Re-export commonly used types
pub use auth::{AuthSession, AuthState, TokenClaims};
pub use config::Config;
pub use engine::{ConversationEngine, TurnOutcome, TurnState};
pub use error::{MitraError, Result};
pub use format::{format_message, Node};
pub use gateway::{Gateway, HttpGateway};
pub use session::{Conversation, Message, SessionStore};
