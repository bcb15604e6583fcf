//! Gateway trait and common types
//!
//! This module defines the contract the conversation engine and auth
//! session depend on. The engine accepts any implementation of the
//! trait, which keeps the network boundary swappable in tests.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One assistant reply from the chat endpoint
///
/// `confidence` and `sources` are optional metadata returned by the
/// inference backend alongside a reply; the client passes them through
/// unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    /// The raw assistant reply text
    pub response: String,

    /// Optional confidence score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Optional source titles used for the reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

/// An access grant returned by the auth endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthGrant {
    /// Compact three-segment access token
    pub access_token: String,
}

/// Backend health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status string (e.g. "healthy", "degraded")
    pub status: String,

    /// Backend version, when reported
    #[serde(default)]
    pub version: Option<String>,
}

/// Acknowledgement of a document upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadAck {
    /// Human-readable acknowledgement
    #[serde(default)]
    pub message: String,

    /// Identifier assigned to the stored document, when reported
    #[serde(default)]
    pub document_id: Option<i64>,
}

/// Contract to the remote chat/auth/document endpoints
///
/// Implementations own transport policy (timeouts, retries-if-any,
/// authorization headers); the engine only sees `Result` values.
/// Transport failures and non-success statuses surface as
/// `MitraError::Network`.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send one user message for the given backend session
    ///
    /// # Arguments
    ///
    /// * `text` - The user message text
    /// * `session_id` - Opaque per-conversation session identifier
    ///
    /// # Errors
    ///
    /// Returns `MitraError::Network` on transport failure or a
    /// non-success status
    async fn send_message(&self, text: &str, session_id: &str) -> Result<ChatReply>;

    /// Exchange credentials for an access token
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant>;

    /// Create an account and receive an access token
    async fn register(&self, email: &str, username: &str, password: &str) -> Result<AuthGrant>;

    /// Probe backend connectivity
    async fn check_health(&self) -> Result<HealthStatus>;

    /// Upload a document for retrieval-augmented replies
    ///
    /// # Arguments
    ///
    /// * `path` - Local file to upload
    /// * `session_id` - Session to associate the upload with, when known
    async fn upload_document(&self, path: &Path, session_id: Option<&str>) -> Result<UploadAck>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_reply_deserializes_without_metadata() {
        let reply: ChatReply = serde_json::from_str(r#"{"response":"hi"}"#).unwrap();
        assert_eq!(reply.response, "hi");
        assert!(reply.confidence.is_none());
        assert!(reply.sources.is_none());
    }

    #[test]
    fn test_chat_reply_serialization_skips_absent_metadata() {
        let reply = ChatReply {
            response: "hi".to_string(),
            confidence: None,
            sources: None,
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(json, r#"{"response":"hi"}"#);
    }

    #[test]
    fn test_health_status_tolerates_missing_version() {
        let health: HealthStatus = serde_json::from_str(r#"{"status":"healthy"}"#).unwrap();
        assert_eq!(health.status, "healthy");
        assert!(health.version.is_none());
    }

    #[test]
    fn test_upload_ack_defaults() {
        let ack: UploadAck = serde_json::from_str("{}").unwrap();
        assert!(ack.message.is_empty());
        assert!(ack.document_id.is_none());
    }
}
