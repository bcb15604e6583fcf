//! Non-authoritative access token decoding
//!
//! Decodes the payload segment of a compact three-segment token
//! (`header.payload.signature`) without verifying its signature. The
//! decoded claims are a UI hint only: the gateway backend remains the
//! sole authority on token validity and expiry, and the local decode
//! path must never be used to grant privileged operations.

use crate::error::{MitraError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Decoded view of the token payload
///
/// Mirrors the claims the backend places in the payload segment. The
/// subject arrives as either a number or a string depending on the
/// issuer, so it is normalized to a string on decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user identifier)
    #[serde(rename = "sub", deserialize_with = "subject_as_string")]
    pub subject: String,

    /// Account email
    pub email: String,

    /// Display name
    pub name: String,

    /// Expiry as unix seconds
    pub exp: i64,
}

impl TokenClaims {
    /// Expiry as a UTC timestamp
    ///
    /// # Examples
    ///
    /// ```
    /// use mitra::auth::TokenClaims;
    ///
    /// let claims = TokenClaims {
    ///     subject: "1".to_string(),
    ///     email: "a@b.c".to_string(),
    ///     name: "a".to_string(),
    ///     exp: 0,
    /// };
    /// assert_eq!(claims.expires_at().timestamp(), 0);
    /// ```
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(|| DateTime::<Utc>::MIN_UTC)
    }

    /// Whether the expiry lies strictly in the past
    pub fn is_expired(&self) -> bool {
        self.expires_at() < Utc::now()
    }
}

fn subject_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Subject {
        Text(String),
        Number(i64),
    }

    Ok(match Subject::deserialize(deserializer)? {
        Subject::Text(s) => s,
        Subject::Number(n) => n.to_string(),
    })
}

/// Decode the payload segment of a compact token
///
/// The token must have exactly three dot-separated segments; only the
/// middle one is read (base64url, no padding, JSON object).
///
/// # Arguments
///
/// * `token` - The compact token string
///
/// # Errors
///
/// Returns `MitraError::TokenDecode` when the token shape, the base64
/// encoding, or the JSON payload is invalid
pub fn decode_token(token: &str) -> Result<TokenClaims> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(
            MitraError::TokenDecode("token must have exactly three segments".to_string()).into(),
        );
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| MitraError::TokenDecode(format!("payload is not base64url: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| MitraError::TokenDecode(format!("payload is not valid claims JSON: {}", e)).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds an unsigned compact token around the given payload JSON.
    fn token_with_payload(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap());
        format!("{}.{}.sig", header, body)
    }

    #[test]
    fn test_decode_well_formed_token() {
        let token = token_with_payload(&serde_json::json!({
            "sub": 42,
            "email": "ada@example.com",
            "name": "ada",
            "exp": 4102444800i64,
        }));

        let claims = decode_token(&token).unwrap();
        assert_eq!(claims.subject, "42");
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.name, "ada");
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_decode_string_subject() {
        let token = token_with_payload(&serde_json::json!({
            "sub": "user-7",
            "email": "x@y.z",
            "name": "x",
            "exp": 4102444800i64,
        }));

        let claims = decode_token(&token).unwrap();
        assert_eq!(claims.subject, "user-7");
    }

    #[test]
    fn test_decode_ignores_extra_claims() {
        let token = token_with_payload(&serde_json::json!({
            "sub": 1,
            "email": "x@y.z",
            "name": "x",
            "exp": 4102444800i64,
            "iat": 1700000000,
            "user_id": 1,
        }));

        assert!(decode_token(&token).is_ok());
    }

    #[test]
    fn test_decode_rejects_two_segments() {
        let err = decode_token("only.two").unwrap_err();
        assert!(err.to_string().contains("three segments"));
    }

    #[test]
    fn test_decode_rejects_four_segments() {
        assert!(decode_token("a.b.c.d").is_err());
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        assert!(decode_token("head.!!!not-base64!!!.sig").is_err());
    }

    #[test]
    fn test_decode_rejects_non_claims_payload() {
        let body = URL_SAFE_NO_PAD.encode(b"[1,2,3]");
        let token = format!("head.{}.sig", body);
        assert!(decode_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_detected() {
        let token = token_with_payload(&serde_json::json!({
            "sub": 1,
            "email": "x@y.z",
            "name": "x",
            "exp": 1000,
        }));

        let claims = decode_token(&token).unwrap();
        assert!(claims.is_expired());
    }
}
