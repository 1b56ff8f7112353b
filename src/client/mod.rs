//! MCP client - the enumeration half of the protocol
//!
//! A deliberately narrow client: initialize, the three listing endpoints,
//! and teardown. The scanner never invokes tools, reads resources or
//! renders prompts - enumeration only.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::protocol::{
    mcp::{self, methods},
    Implementation, InitializeParams, InitializeResult, ListPromptsResult, ListResourcesResult,
    ListToolsResult, Prompt, Resource, ServerCapabilities, Tool,
};
use crate::transport::{Transport, TransportError, TransportKind};

/// MCP client bound to a single transport
pub struct McpClient {
    transport: Box<dyn Transport>,
    client_info: Implementation,
    server_capabilities: Option<ServerCapabilities>,
}

impl McpClient {
    pub fn new(transport: Box<dyn Transport>, client_info: Implementation) -> Self {
        Self {
            transport,
            client_info,
            server_capabilities: None,
        }
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Server capabilities, available after a successful initialize.
    pub fn server_capabilities(&self) -> Option<&ServerCapabilities> {
        self.server_capabilities.as_ref()
    }

    /// Perform the initialize handshake and send the initialized
    /// notification. Must precede any listing call.
    pub async fn initialize(&mut self) -> Result<InitializeResult, TransportError> {
        let params = InitializeParams::new(self.client_info.clone());
        let params_value = serde_json::to_value(&params)
            .map_err(|e| TransportError::Malformed(e.to_string()))?;

        let result = self
            .transport
            .request(methods::INITIALIZE, Some(params_value))
            .await?;

        let init: InitializeResult = decode(result)?;

        if !mcp::is_supported_version(&init.protocol_version) {
            return Err(TransportError::Malformed(format!(
                "unsupported protocol version: {}",
                init.protocol_version
            )));
        }

        self.server_capabilities = Some(init.capabilities.clone());

        // The initialized notification completes the handshake; a server
        // that rejects it is still enumerable, so failures are non-fatal.
        if let Err(e) = self.transport.notify(methods::INITIALIZED, None).await {
            tracing::debug!("initialized notification failed: {}", e);
        }

        Ok(init)
    }

    /// List tools. Empty when the server does not advertise the capability.
    pub async fn list_tools(&mut self) -> Result<Vec<Tool>, TransportError> {
        if !self.has_capability(ServerCapabilities::has_tools) {
            return Ok(Vec::new());
        }
        let result = self.transport.request(methods::TOOLS_LIST, None).await?;
        let listing: ListToolsResult = decode(result)?;
        Ok(listing.tools)
    }

    /// List resources. Empty when the server does not advertise the capability.
    pub async fn list_resources(&mut self) -> Result<Vec<Resource>, TransportError> {
        if !self.has_capability(ServerCapabilities::has_resources) {
            return Ok(Vec::new());
        }
        let result = self
            .transport
            .request(methods::RESOURCES_LIST, None)
            .await?;
        let listing: ListResourcesResult = decode(result)?;
        Ok(listing.resources)
    }

    /// List prompts. Empty when the server does not advertise the capability.
    pub async fn list_prompts(&mut self) -> Result<Vec<Prompt>, TransportError> {
        if !self.has_capability(ServerCapabilities::has_prompts) {
            return Ok(Vec::new());
        }
        let result = self.transport.request(methods::PROMPTS_LIST, None).await?;
        let listing: ListPromptsResult = decode(result)?;
        Ok(listing.prompts)
    }

    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.transport.close().await
    }

    fn has_capability(&self, check: fn(&ServerCapabilities) -> bool) -> bool {
        self.server_capabilities.as_ref().map(check).unwrap_or(false)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, TransportError> {
    serde_json::from_value(value).map_err(|e| TransportError::Malformed(e.to_string()))
}
