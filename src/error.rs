//! Error types for Mitra
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Mitra operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, turn orchestration, gateway interactions,
/// token decoding, and conversation persistence.
#[derive(Error, Debug)]
pub enum MitraError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Outgoing message rejected before any network call
    ///
    /// Raised for empty-after-trim or oversize messages. Fully
    /// recoverable; no conversation state is changed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport failure or non-success response from the gateway
    ///
    /// Surfaced to the user during a turn; the optimistic user message
    /// is retained and no automatic retry is attempted.
    #[error("Network error: {0}")]
    Network(String),

    /// Stored access token could not be decoded
    ///
    /// Forces the auth session to `Unauthenticated` and clears local
    /// session data; never silently ignored.
    #[error("Token decode error: {0}")]
    TokenDecode(String),

    /// Authentication errors (e.g., rejected credentials)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Conversation storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Mitra operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
