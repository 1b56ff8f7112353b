//! Capability enumerator
//!
//! Establishes a protocol session with a target and retrieves the tools,
//! resources and prompt templates it exposes, plus server metadata.
//!
//! Enumeration runs in an isolated worker process: the host writes one
//! serialized request to the child's stdin and reads one serialized reply
//! from its stdout. A hostile target can therefore corrupt at most its own
//! worker, never the orchestrating process or sibling scans. The in-process
//! path (`enumerate_with_client`) carries the actual protocol logic and is
//! what the worker - and the test suite, via a mock transport - executes.

pub mod session;
mod worker;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::McpClient;
use crate::errors::EnumerateError;
use crate::protocol::Implementation;
use crate::transport::{connect, detect_transport, TransportConfig, TransportError, TransportKind};

pub use session::{
    AuthOutcome, Constraints, HealthProbe, ParamSpec, ParamType, PromptCapability,
    ResourceCapability, ScanSession, ServerInfo, ToolCapability,
};
pub use worker::{run_worker, WORKER_SUBCOMMAND};

/// Everything a worker needs to enumerate one target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumerateRequest {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    pub timeout_secs: u64,
}

impl EnumerateRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            transport: None,
            bearer_token: None,
            timeout_secs: 30,
        }
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport
            .unwrap_or_else(|| detect_transport(&self.target))
    }
}

/// Wire shape crossing the worker-process boundary
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WorkerReply {
    Session { session: ScanSession },
    Unreachable { message: String },
    Protocol { transport: String, message: String },
}

impl WorkerReply {
    pub fn from_result(result: Result<ScanSession, EnumerateError>) -> Self {
        match result {
            Ok(session) => WorkerReply::Session { session },
            Err(EnumerateError::Unreachable { message }) => WorkerReply::Unreachable { message },
            Err(EnumerateError::Protocol { transport, message }) => {
                WorkerReply::Protocol { transport, message }
            }
        }
    }

    pub fn into_result(self) -> Result<ScanSession, EnumerateError> {
        match self {
            WorkerReply::Session { session } => Ok(session),
            WorkerReply::Unreachable { message } => Err(EnumerateError::Unreachable { message }),
            WorkerReply::Protocol { transport, message } => {
                Err(EnumerateError::Protocol { transport, message })
            }
        }
    }
}

/// Enumerate in an isolated worker process.
///
/// On timeout the worker is killed and the scan fails `Unreachable`;
/// whatever the worker had gathered is discarded. A partially enumerated
/// session must never be scored as if complete.
pub async fn enumerate_isolated(request: &EnumerateRequest) -> Result<ScanSession, EnumerateError> {
    worker::spawn_and_wait(request).await
}

/// Enumerate inside the current process.
///
/// The worker subprocess calls this; tests call it with a mock transport
/// through `enumerate_with_client`.
pub async fn enumerate(request: &EnumerateRequest) -> Result<ScanSession, EnumerateError> {
    let kind = request.transport_kind();
    let health = probe_health(&request.target, request.timeout_secs.min(5)).await;

    let config = TransportConfig {
        timeout_secs: request.timeout_secs,
        bearer_token: request.bearer_token.clone(),
    };
    let transport = connect(&request.target, kind, config)
        .map_err(|e| EnumerateError::from_transport(&kind.to_string(), e))?;

    let client = McpClient::new(transport, Implementation::new("mcprecon", env!("CARGO_PKG_VERSION")));

    let mut session = enumerate_with_client(client, &request.target, request.bearer_token.is_some())
        .await?;
    session.health = health;
    Ok(session)
}

/// The sequential protocol conversation: initialize, then tools, resources
/// and prompts in that order, no overlap.
pub async fn enumerate_with_client(
    mut client: McpClient,
    target: &str,
    authenticated: bool,
) -> Result<ScanSession, EnumerateError> {
    let kind = client.transport_kind();
    let mut session = ScanSession::new(target, kind);

    let init = match client.initialize().await {
        Ok(init) => init,
        Err(TransportError::AuthRejected { status }) => {
            // Not a failure: the server enforcing credentials is itself a
            // finding. The session completes with empty capability lists.
            tracing::info!("target rejected unauthenticated session (HTTP {})", status);
            session.auth = AuthOutcome::Rejected;
            session.finalize();
            return Ok(session);
        }
        Err(e) => return Err(EnumerateError::from_transport(&kind.to_string(), e)),
    };

    session.server_info = Some(ServerInfo {
        name: init.server_info.name.clone(),
        version: init.server_info.version.clone(),
        protocol_version: init.protocol_version.clone(),
        capabilities: init.capabilities.clone(),
    });

    let tools = client
        .list_tools()
        .await
        .map_err(|e| listing_error(&kind, e))?;
    session.tools = tools.iter().map(ToolCapability::from_tool).collect();

    let resources = client
        .list_resources()
        .await
        .map_err(|e| listing_error(&kind, e))?;
    session.resources = resources
        .iter()
        .map(ResourceCapability::from_resource)
        .collect();

    let prompts = client
        .list_prompts()
        .await
        .map_err(|e| listing_error(&kind, e))?;
    session.prompts = prompts.iter().map(PromptCapability::from_prompt).collect();

    session.auth = if authenticated {
        AuthOutcome::NotApplicable
    } else {
        AuthOutcome::AcceptedWithoutCredentials
    };

    if let Err(e) = client.close().await {
        tracing::debug!("session teardown failed: {}", e);
    }

    session.finalize();
    tracing::info!(
        "enumerated {}: {} tools, {} resources, {} prompts",
        target,
        session.tools.len(),
        session.resources.len(),
        session.prompts.len()
    );
    Ok(session)
}

/// After a successful handshake every failure is a protocol error, auth
/// rejection included - a server that initializes anonymously and then
/// rejects listings is misbehaving, not protecting itself.
fn listing_error(kind: &TransportKind, err: TransportError) -> EnumerateError {
    match err {
        TransportError::Connect(msg) => EnumerateError::unreachable(msg),
        TransportError::Timeout => EnumerateError::unreachable("listing timed out"),
        other => EnumerateError::protocol(kind.to_string(), other.to_string()),
    }
}

/// Plain reachability probe against the target's origin before the real
/// handshake. Absence of a health endpoint is recorded, never fatal.
async fn probe_health(target: &str, timeout_secs: u64) -> Option<HealthProbe> {
    let origin = Url::parse(target).ok().and_then(|u| {
        u.host_str()
            .map(|h| match u.port() {
                Some(p) => format!("{}://{}:{}/health", u.scheme(), h, p),
                None => format!("{}://{}/health", u.scheme(), h),
            })
    })?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .ok()?;

    match client.get(&origin).send().await {
        Ok(response) => Some(HealthProbe {
            reachable: true,
            status: Some(response.status().as_u16()),
        }),
        Err(e) => {
            tracing::debug!("health probe failed for {}: {}", origin, e);
            Some(HealthProbe {
                reachable: false,
                status: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockTransport, TransportError};

    fn client(mock: MockTransport) -> McpClient {
        McpClient::new(Box::new(mock), Implementation::new("test", "0.0.0"))
    }

    fn listed_server() -> MockTransport {
        MockTransport::new()
            .on(
                "initialize",
                serde_json::json!({
                    "protocolVersion": "2025-03-26",
                    "capabilities": {"tools": {}, "resources": {}, "prompts": {}},
                    "serverInfo": {"name": "demo", "version": "1.0.0"}
                }),
            )
            .on(
                "tools/list",
                serde_json::json!({"tools": [
                    {"name": "echo", "description": "Echo input", "inputSchema": {
                        "type": "object",
                        "properties": {"text": {"type": "string"}}
                    }}
                ]}),
            )
            .on(
                "resources/list",
                serde_json::json!({"resources": [
                    {"uri": "file:///etc/app.conf", "name": "config"}
                ]}),
            )
            .on(
                "prompts/list",
                serde_json::json!({"prompts": [
                    {"name": "summarize", "description": "Summarize text"}
                ]}),
            )
    }

    #[tokio::test]
    async fn enumerates_all_capability_kinds() {
        let session = enumerate_with_client(client(listed_server()), "https://t.example/mcp", false)
            .await
            .unwrap();

        assert_eq!(session.tools.len(), 1);
        assert_eq!(session.resources.len(), 1);
        assert_eq!(session.prompts.len(), 1);
        assert_eq!(session.auth, AuthOutcome::AcceptedWithoutCredentials);
        assert!(session.finished_at.is_some());
        assert_eq!(session.server_info.as_ref().unwrap().name, "demo");
    }

    #[tokio::test]
    async fn conversation_is_strictly_sequential() {
        let mock = listed_server();
        let log = mock.call_log();
        enumerate_with_client(client(mock), "https://t.example/mcp", false)
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "initialize",
                "notifications/initialized",
                "tools/list",
                "resources/list",
                "prompts/list"
            ]
        );
    }

    #[tokio::test]
    async fn auth_rejection_is_a_successful_outcome() {
        let mock =
            MockTransport::new().fail("initialize", TransportError::AuthRejected { status: 401 });
        let session = enumerate_with_client(client(mock), "https://t.example/mcp", false)
            .await
            .unwrap();

        assert_eq!(session.auth, AuthOutcome::Rejected);
        assert_eq!(session.capability_count(), 0);
        assert!(session.server_info.is_none());
    }

    #[tokio::test]
    async fn connection_refused_is_unreachable() {
        let mock = MockTransport::new()
            .fail("initialize", TransportError::Connect("refused".to_string()));
        let err = enumerate_with_client(client(mock), "https://t.example/mcp", false)
            .await
            .unwrap_err();
        assert!(err.is_unreachable());
    }

    #[tokio::test]
    async fn listing_timeout_is_unreachable_and_discards_partial_data() {
        let mock = MockTransport::new()
            .on(
                "initialize",
                serde_json::json!({
                    "protocolVersion": "2025-03-26",
                    "capabilities": {"tools": {}, "resources": {}},
                    "serverInfo": {"name": "demo", "version": "1.0.0"}
                }),
            )
            .on("tools/list", serde_json::json!({"tools": [{"name": "echo"}]}))
            .fail("resources/list", TransportError::Timeout);

        // tools/list succeeded before the timeout, but the session as a
        // whole fails: partial capability data is never reported.
        let err = enumerate_with_client(client(mock), "https://t.example/mcp", false)
            .await
            .unwrap_err();
        assert!(err.is_unreachable());
    }

    #[tokio::test]
    async fn malformed_listing_is_protocol_error() {
        let mock = MockTransport::new()
            .on(
                "initialize",
                serde_json::json!({
                    "protocolVersion": "2025-03-26",
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": "demo", "version": "1.0.0"}
                }),
            )
            .on("tools/list", serde_json::json!({"unexpected": "shape"}));

        let err = enumerate_with_client(client(mock), "https://t.example/mcp", false)
            .await
            .unwrap_err();
        assert!(matches!(err, EnumerateError::Protocol { .. }));
    }

    #[tokio::test]
    async fn bearer_token_marks_auth_not_applicable() {
        let session = enumerate_with_client(client(listed_server()), "https://t.example/mcp", true)
            .await
            .unwrap();
        assert_eq!(session.auth, AuthOutcome::NotApplicable);
    }

    #[test]
    fn worker_reply_roundtrip() {
        let session = ScanSession::new("https://t.example/mcp", TransportKind::Sse);
        let reply = WorkerReply::from_result(Ok(session));
        let json = serde_json::to_string(&reply).unwrap();
        let back: WorkerReply = serde_json::from_str(&json).unwrap();
        assert!(back.into_result().is_ok());

        let reply = WorkerReply::from_result(Err(EnumerateError::unreachable("timed out")));
        let json = serde_json::to_string(&reply).unwrap();
        let back: WorkerReply = serde_json::from_str(&json).unwrap();
        assert!(back.into_result().unwrap_err().is_unreachable());
    }

    #[test]
    fn request_transport_detection() {
        let mut req = EnumerateRequest::new("https://t.example/sse");
        assert_eq!(req.transport_kind(), TransportKind::Sse);
        req.transport = Some(TransportKind::StreamableHttp);
        assert_eq!(req.transport_kind(), TransportKind::StreamableHttp);
    }
}
