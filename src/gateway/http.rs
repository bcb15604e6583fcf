//! HTTP gateway implementation
//!
//! Implements the [`Gateway`] trait over the backend's REST endpoints
//! with `reqwest`. The base URL is configurable so tests can point the
//! client at a mock server.

use crate::config::GatewayConfig;
use crate::error::{MitraError, Result};
use crate::gateway::{AuthGrant, ChatReply, Gateway, HealthStatus, UploadAck};

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// REST gateway client
///
/// Holds one pooled HTTP client for the lifetime of the process. When a
/// bearer token is attached it is sent with every request; the backend
/// decides what anonymous requests may do.
pub struct HttpGateway {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

/// Request body for the chat endpoint
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    session_id: &'a str,
}

/// Response body from the chat endpoint
#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
    #[serde(default)]
    confidence_score: Option<f64>,
    #[serde(default)]
    context_chunks: Vec<ContextChunk>,
}

/// One retrieval chunk reference attached to a reply
#[derive(Debug, Deserialize)]
struct ContextChunk {
    title: String,
}

/// Request body for the login endpoint
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Request body for the register endpoint
#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    username: &'a str,
    password: &'a str,
}

/// Error body the backend returns on non-success statuses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

impl HttpGateway {
    /// Create a new gateway client from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Gateway configuration with base URL and timeout
    ///
    /// # Errors
    ///
    /// Returns `MitraError::Network` if HTTP client initialization fails
    ///
    /// # Examples
    ///
    /// ```
    /// use mitra::config::GatewayConfig;
    /// use mitra::gateway::HttpGateway;
    ///
    /// let gateway = HttpGateway::new(&GatewayConfig::default());
    /// assert!(gateway.is_ok());
    /// ```
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("mitra/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MitraError::Network(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized gateway client: base_url={}", config.base_url);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: None,
        })
    }

    /// Attach a bearer token sent with every subsequent request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// The configured base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Turn a non-success response into the matching error
    ///
    /// Rejected credentials map to `Authentication`; everything else is
    /// a `Network` error carrying the backend's message when one is
    /// present.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| "no detail provided".to_string());

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(MitraError::Authentication(detail).into());
        }

        Err(MitraError::Network(format!("gateway returned {}: {}", status, detail)).into())
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn send_message(&self, text: &str, session_id: &str) -> Result<ChatReply> {
        let request = ChatRequest {
            message: text,
            session_id,
        };

        let response = self
            .apply_auth(self.client.post(self.endpoint("/api/chat")))
            .json(&request)
            .send()
            .await
            .map_err(|e| MitraError::Network(format!("chat request failed: {}", e)))?;

        let body: ChatResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| MitraError::Network(format!("invalid chat response: {}", e)))?;

        let sources = if body.context_chunks.is_empty() {
            None
        } else {
            Some(body.context_chunks.into_iter().map(|c| c.title).collect())
        };

        Ok(ChatReply {
            response: body.response,
            confidence: body.confidence_score,
            sources,
        })
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant> {
        let response = self
            .client
            .post(self.endpoint("/api/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|e| MitraError::Network(format!("login request failed: {}", e)))?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| MitraError::Network(format!("invalid login response: {}", e)).into())
    }

    async fn register(&self, email: &str, username: &str, password: &str) -> Result<AuthGrant> {
        let response = self
            .client
            .post(self.endpoint("/api/register"))
            .json(&RegisterRequest {
                email,
                username,
                password,
            })
            .send()
            .await
            .map_err(|e| MitraError::Network(format!("register request failed: {}", e)))?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| MitraError::Network(format!("invalid register response: {}", e)).into())
    }

    async fn check_health(&self) -> Result<HealthStatus> {
        let response = self
            .client
            .get(self.endpoint("/api/health"))
            .send()
            .await
            .map_err(|e| MitraError::Network(format!("health request failed: {}", e)))?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| MitraError::Network(format!("invalid health response: {}", e)).into())
    }

    async fn upload_document(&self, path: &Path, session_id: Option<&str>) -> Result<UploadAck> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| MitraError::Validation("upload path has no file name".to_string()))?;

        let bytes = tokio::fs::read(path).await?;

        let mut form = multipart::Form::new().part(
            "file",
            multipart::Part::bytes(bytes).file_name(file_name),
        );
        if let Some(session_id) = session_id {
            form = form.text("session_id", session_id.to_string());
        }

        let response = self
            .apply_auth(self.client.post(self.endpoint("/api/upload")))
            .multipart(form)
            .send()
            .await
            .map_err(|e| MitraError::Network(format!("upload request failed: {}", e)))?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| MitraError::Network(format!("invalid upload response: {}", e)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_gateway() {
        let gateway = HttpGateway::new(&GatewayConfig::default()).unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:5000");
        assert!(gateway.bearer_token.is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = GatewayConfig {
            base_url: "http://example.com/".to_string(),
            timeout_seconds: 5,
        };
        let gateway = HttpGateway::new(&config).unwrap();
        assert_eq!(gateway.endpoint("/api/chat"), "http://example.com/api/chat");
    }

    #[test]
    fn test_with_token_attaches_bearer() {
        let gateway = HttpGateway::new(&GatewayConfig::default())
            .unwrap()
            .with_token("aaa.bbb.ccc");
        assert_eq!(gateway.bearer_token.as_deref(), Some("aaa.bbb.ccc"));
    }

    #[test]
    fn test_chat_response_maps_chunk_titles_to_sources() {
        let json = r#"{
            "response": "10",
            "session_id": "s",
            "confidence_score": 0.9,
            "sources_used": 2,
            "context_chunks": [
                {"title": "Arithmetic", "snippet": "…", "relevance_score": 0.8},
                {"title": "Numbers", "snippet": "…", "relevance_score": 0.5}
            ]
        }"#;

        let body: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.response, "10");
        assert_eq!(body.confidence_score, Some(0.9));
        let titles: Vec<_> = body.context_chunks.iter().map(|c| c.title.clone()).collect();
        assert_eq!(titles, vec!["Arithmetic", "Numbers"]);
    }

    #[test]
    fn test_chat_response_tolerates_minimal_body() {
        let body: ChatResponse = serde_json::from_str(r#"{"response":"ok"}"#).unwrap();
        assert!(body.confidence_score.is_none());
        assert!(body.context_chunks.is_empty());
    }
}
