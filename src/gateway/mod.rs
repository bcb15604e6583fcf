//! Gateway contract and HTTP implementation
//!
//! The rest of the crate depends only on the [`Gateway`] trait; the
//! `reqwest`-backed [`HttpGateway`] is the production implementation.

pub mod base;
pub mod http;

pub use base::{AuthGrant, ChatReply, Gateway, HealthStatus, UploadAck};
pub use http::HttpGateway;
