//! Legacy SSE transport for remote MCP servers
//!
//! Speaks the MCP 2024-11-05 HTTP+SSE shape: JSON-RPC requests are POSTed to
//! the message endpoint and answered with plain JSON bodies. The scanner
//! only needs the request/notify half of the conversation; it never holds
//! the event stream open.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use url::Url;

use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

use super::{Transport, TransportConfig, TransportError, TransportKind};

/// SSE transport for communicating with remote MCP servers
pub struct SseTransport {
    endpoint: Url,
    client: reqwest::Client,
    bearer_token: Option<String>,
    request_id: u64,
}

impl SseTransport {
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
            bearer_token: config.bearer_token,
            request_id: 0,
        })
    }

    fn next_id(&mut self) -> u64 {
        self.request_id += 1;
        self.request_id
    }

    fn post(&self) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(self.endpoint.clone());
        if let Some(ref token) = self.bearer_token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder
    }
}

#[async_trait::async_trait]
impl Transport for SseTransport {
    async fn request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, TransportError> {
        let id = self.next_id();
        let request = JsonRpcRequest::new(id, method, params);

        let response = self
            .post()
            .json(&request)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::from_status(status.as_u16(), body));
        }

        let rpc_response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))?;

        rpc_response.into_result().map_err(TransportError::Rpc)
    }

    async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), TransportError> {
        let notification = JsonRpcNotification::new(method, params);

        let response = self
            .post()
            .json(&notification)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::from_status(status.as_u16(), body));
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // Stateless POST endpoint, nothing to tear down
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Sse
    }
}
