//! Conversation turn orchestration

pub mod core;

pub use core::{ConversationEngine, TurnOutcome, TurnState};
