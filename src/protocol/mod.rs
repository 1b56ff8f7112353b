//! MCP protocol definitions and JSON-RPC message handling

pub mod jsonrpc;
pub mod mcp;

pub use jsonrpc::{JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId};
pub use mcp::{
    Implementation, InitializeParams, InitializeResult, ListPromptsResult, ListResourcesResult,
    ListToolsResult, Prompt, PromptArgument, Resource, ServerCapabilities, Tool,
};
