//! Streamable HTTP transport for remote MCP servers
//!
//! Implements the MCP 2025-03-26 Streamable HTTP transport: JSON-RPC over
//! POST with session management via the `Mcp-Session-Id` header. Responses
//! may arrive either as plain JSON or as a short SSE stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use url::Url;

use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId};

use super::{Transport, TransportConfig, TransportError, TransportKind};

/// HTTP header carrying the MCP session ID
const MCP_SESSION_ID_HEADER: &str = "Mcp-Session-Id";

/// Streamable HTTP transport for remote MCP servers
#[derive(Debug)]
pub struct StreamableHttpTransport {
    endpoint: Url,
    client: reqwest::Client,
    session_id: Option<String>,
    bearer_token: Option<String>,
    request_id: AtomicU64,
}

impl StreamableHttpTransport {
    pub fn new(endpoint: &str, config: TransportConfig) -> Result<Self, TransportError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| TransportError::Connect(format!("invalid endpoint URL: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .use_rustls_tls()
            .build()
            .map_err(|e| TransportError::Connect(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            client,
            session_id: None,
            bearer_token: config.bearer_token,
            request_id: AtomicU64::new(0),
        })
    }

    fn next_id(&self) -> RequestId {
        RequestId::Number(self.request_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Current session ID, once the server has assigned one
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn build_request(&self) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header(ACCEPT, "application/json, text/event-stream")
            .header(CONTENT_TYPE, "application/json");

        if let Some(ref token) = self.bearer_token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(ref session_id) = self.session_id {
            builder = builder.header(MCP_SESSION_ID_HEADER, session_id);
        }

        builder
    }

    fn extract_session_id(&mut self, headers: &HeaderMap) {
        if let Some(session_id) = headers.get(MCP_SESSION_ID_HEADER) {
            if let Ok(id) = session_id.to_str() {
                self.session_id = Some(id.to_string());
                tracing::debug!("established session: {}", id);
            }
        }
    }

    /// Pull the first JSON-RPC response out of an SSE-framed body.
    fn parse_sse_body(&self, text: &str) -> Result<JsonRpcResponse, TransportError> {
        for line in text.lines() {
            let line = line.trim();

            if let Some(data) = line.strip_prefix("data: ") {
                if data.is_empty() || data == "[DONE]" {
                    continue;
                }

                if let Ok(response) = serde_json::from_str::<JsonRpcResponse>(data) {
                    return Ok(response);
                }

                if let Ok(notification) = serde_json::from_str::<JsonRpcNotification>(data) {
                    tracing::debug!("skipping notification in SSE body: {}", notification.method);
                    continue;
                }
            }
        }

        Err(TransportError::Malformed(
            "no JSON-RPC response found in SSE stream".to_string(),
        ))
    }

    async fn check_status(
        &mut self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, TransportError> {
        if response.status() == reqwest::StatusCode::NOT_FOUND && self.session_id.is_some() {
            self.session_id = None;
            return Err(TransportError::Http {
                status: 404,
                body: "session expired, re-initialization required".to_string(),
            });
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::from_status(status.as_u16(), body));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl Transport for StreamableHttpTransport {
    async fn request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, TransportError> {
        let id = self.next_id();
        let request = JsonRpcRequest::new(id, method, params);

        let response = self
            .build_request()
            .json(&request)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let response = self.check_status(response).await?;
        self.extract_session_id(response.headers());

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let rpc_response = if content_type.starts_with("text/event-stream") {
            let text = response
                .text()
                .await
                .map_err(TransportError::from_reqwest)?;
            self.parse_sse_body(&text)?
        } else {
            response
                .json::<JsonRpcResponse>()
                .await
                .map_err(|e| TransportError::Malformed(e.to_string()))?
        };

        rpc_response.into_result().map_err(TransportError::Rpc)
    }

    async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), TransportError> {
        let notification = JsonRpcNotification::new(method, params);

        let response = self
            .build_request()
            .json(&notification)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        self.check_status(response).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // Best-effort session termination; 405 means the server does not
        // support it.
        if let Some(session_id) = self.session_id.take() {
            let result = self
                .client
                .delete(self.endpoint.clone())
                .header(MCP_SESSION_ID_HEADER, &session_id)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!("session terminated");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("failed to terminate session: {}", e),
            }
        }
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::StreamableHttp
    }
}
