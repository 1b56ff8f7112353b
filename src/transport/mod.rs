//! Transport layer for MCP server communication
//!
//! Two remote transports are supported:
//! - `streamable_http` - HTTP POST with optional SSE response bodies
//!   (MCP 2025-03-26 spec)
//! - `sse` - legacy HTTP+SSE endpoints (MCP 2024-11-05 spec)
//!
//! Transport selection: an explicit selector always wins; otherwise a URL
//! whose path contains "/sse" (or an `sse` query parameter) gets the legacy
//! transport, everything else gets streamable HTTP. A target that only
//! speaks the other transport fails with a protocol-level error; retrying
//! with the other transport is the caller's decision, never a silent
//! fallback here.

pub mod mock;
pub mod sse;
pub mod streamable_http;

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::protocol::JsonRpcError;

pub use mock::MockTransport;
pub use sse::SseTransport;
pub use streamable_http::StreamableHttpTransport;

/// Errors surfaced by a transport, classified so the enumerator can map
/// them onto its outcome taxonomy.
#[derive(Debug, Error)]
pub enum TransportError {
    /// TCP/TLS level failure: refused, reset, DNS, unreachable host
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// The server rejected the request for lack of credentials (401/403)
    #[error("authentication rejected (HTTP {status})")]
    AuthRejected { status: u16 },

    /// Any other non-success HTTP status
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body could not be understood as JSON-RPC
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The server answered with a JSON-RPC error object
    #[error("JSON-RPC error: {0}")]
    Rpc(JsonRpcError),
}

impl TransportError {
    /// Classify a reqwest failure into the transport taxonomy.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_decode() {
            TransportError::Malformed(err.to_string())
        } else {
            TransportError::Connect(err.to_string())
        }
    }

    pub(crate) fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => TransportError::AuthRejected { status },
            _ => TransportError::Http { status, body },
        }
    }
}

/// MCP transport abstraction
///
/// `request` resolves to the JSON-RPC `result` payload; a server-side error
/// object becomes `TransportError::Rpc`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a JSON-RPC request and return the result payload
    async fn request(&mut self, method: &str, params: Option<Value>)
        -> Result<Value, TransportError>;

    /// Send a notification (no response expected)
    async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), TransportError>;

    /// Close the transport
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Which transport this is, for logging and reporting
    fn kind(&self) -> TransportKind;
}

/// Transport selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Legacy HTTP+SSE transport
    Sse,
    /// Streamable HTTP transport
    StreamableHttp,
}

impl TransportKind {
    /// Short name used in the report schema ("sse" | "http")
    pub fn wire_name(&self) -> &'static str {
        match self {
            TransportKind::Sse => "sse",
            TransportKind::StreamableHttp => "http",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Sse => write!(f, "sse"),
            TransportKind::StreamableHttp => write!(f, "streamable-http"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sse" => Ok(TransportKind::Sse),
            "http" | "streamable-http" | "streamable_http" | "streamablehttp" => {
                Ok(TransportKind::StreamableHttp)
            }
            _ => Err(format!(
                "unknown transport '{}', valid options: sse, streamable-http",
                s
            )),
        }
    }
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Timeout for individual operations in seconds
    pub timeout_secs: u64,
    /// Bearer token presented on every request, if any
    pub bearer_token: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            bearer_token: None,
        }
    }
}

/// Pick a transport for a URL when the caller did not specify one.
pub fn detect_transport(url: &str) -> TransportKind {
    let url_lower = url.to_lowercase();

    if url_lower.contains("/sse") {
        return TransportKind::Sse;
    }
    if let Some(query_start) = url_lower.find('?') {
        if url_lower[query_start..].contains("sse") {
            return TransportKind::Sse;
        }
    }

    TransportKind::StreamableHttp
}

/// Build a transport of the requested kind for `target`.
pub fn connect(
    target: &str,
    kind: TransportKind,
    config: TransportConfig,
) -> Result<Box<dyn Transport>, TransportError> {
    match kind {
        TransportKind::Sse => Ok(Box::new(SseTransport::new(target, config)?)),
        TransportKind::StreamableHttp => {
            Ok(Box::new(StreamableHttpTransport::new(target, config)?))
        }
    }
}
