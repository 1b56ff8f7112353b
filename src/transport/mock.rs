//! Mock transport for testing the enumerator and scan pipeline without a
//! live server.
//!
//! Responses are scripted per method; each call pops the next scripted
//! reply, so a method can succeed once and fail later (or vice versa).

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::{Transport, TransportError, TransportKind};

type ScriptedReply = Result<Value, TransportError>;

/// Scriptable in-memory transport
pub struct MockTransport {
    kind: TransportKind,
    replies: HashMap<String, VecDeque<ScriptedReply>>,
    /// Methods seen, in call order (requests and notifications). Shared so
    /// a test can keep observing after the transport moves into a client.
    calls: Arc<Mutex<Vec<String>>>,
    pub closed: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            kind: TransportKind::StreamableHttp,
            replies: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            closed: false,
        }
    }

    /// Handle onto the call log
    pub fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }

    fn record(&self, method: &str) {
        self.calls.lock().expect("call log poisoned").push(method.to_string());
    }

    pub fn with_kind(mut self, kind: TransportKind) -> Self {
        self.kind = kind;
        self
    }

    /// Script a successful reply for `method`.
    pub fn on(mut self, method: &str, result: Value) -> Self {
        self.replies
            .entry(method.to_string())
            .or_default()
            .push_back(Ok(result));
        self
    }

    /// Script a failure for `method`.
    pub fn fail(mut self, method: &str, error: TransportError) -> Self {
        self.replies
            .entry(method.to_string())
            .or_default()
            .push_back(Err(error));
        self
    }

    /// A transport that answers a plain initialize handshake and empty
    /// listings - the smallest healthy server.
    pub fn healthy_server() -> Self {
        Self::new()
            .on(
                "initialize",
                serde_json::json!({
                    "protocolVersion": "2025-03-26",
                    "capabilities": {"tools": {}, "resources": {}, "prompts": {}},
                    "serverInfo": {"name": "mock-server", "version": "1.0.0"}
                }),
            )
            .on("tools/list", serde_json::json!({"tools": []}))
            .on("resources/list", serde_json::json!({"resources": []}))
            .on("prompts/list", serde_json::json!({"prompts": []}))
    }

}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn request(
        &mut self,
        method: &str,
        _params: Option<Value>,
    ) -> Result<Value, TransportError> {
        self.record(method);
        match self.replies.get_mut(method).and_then(|q| q.pop_front()) {
            Some(reply) => reply,
            None => Err(TransportError::Http {
                status: 404,
                body: format!("no scripted reply for '{}'", method),
            }),
        }
    }

    async fn notify(&mut self, method: &str, _params: Option<Value>) -> Result<(), TransportError> {
        self.record(method);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        self.kind
    }
}
