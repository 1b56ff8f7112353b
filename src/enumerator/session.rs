//! Scan session model
//!
//! One `ScanSession` per enumeration attempt against one target. The session
//! is a plain serializable snapshot: it crosses the worker-process boundary
//! as JSON and is finalized (never mutated) once the detector bank has run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::protocol::{Prompt, Resource, ServerCapabilities, Tool};
use crate::transport::TransportKind;

/// How the target responded to an unauthenticated (or token-bearing) session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthOutcome {
    /// The server demanded credentials we did not have. A positive signal.
    Rejected,
    /// Capability listing succeeded with zero credentials presented.
    AcceptedWithoutCredentials,
    /// We authenticated with a caller-supplied token; no conclusion drawn.
    NotApplicable,
}

/// Result of the pre-handshake reachability probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthProbe {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Server identity and advertised capability flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
}

/// Declared type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Unknown,
}

impl ParamType {
    fn from_schema_type(s: &str) -> Self {
        match s {
            "string" => ParamType::String,
            "integer" => ParamType::Integer,
            "number" => ParamType::Number,
            "boolean" => ParamType::Boolean,
            "object" => ParamType::Object,
            "array" => ParamType::Array,
            _ => ParamType::Unknown,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ParamType::Integer | ParamType::Number)
    }
}

/// Declared constraints on a tool parameter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Constraints {
    /// Whether any constraint at all is declared
    pub fn any(&self) -> bool {
        self.min_length.is_some()
            || self.max_length.is_some()
            || self.minimum.is_some()
            || self.maximum.is_some()
            || self.enum_values.is_some()
            || self.pattern.is_some()
    }

    /// Whether the parameter's value space is bounded for string input
    pub fn bounds_string(&self) -> bool {
        self.max_length.is_some() || self.enum_values.is_some() || self.pattern.is_some()
    }

    /// Whether the parameter's value space is bounded for numeric input
    pub fn bounds_number(&self) -> bool {
        self.minimum.is_some() || self.maximum.is_some() || self.enum_values.is_some()
    }
}

/// One declared tool parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub ty: ParamType,
    pub required: bool,
    #[serde(default)]
    pub constraints: Constraints,
}

/// A tool the target exposes, with its parameter schema parsed into a
/// typed, deterministic form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCapability {
    pub name: String,
    /// Free text; empty when the server supplied none
    pub description: String,
    pub params: BTreeMap<String, ParamSpec>,
}

impl ToolCapability {
    /// Parse the protocol-level tool definition. Unparseable schema parts
    /// degrade to `Unknown` typed, unconstrained parameters rather than
    /// failing the session.
    pub fn from_tool(tool: &Tool) -> Self {
        let mut params = BTreeMap::new();

        let required: Vec<String> = tool
            .input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if let Some(props) = tool.input_schema.get("properties").and_then(Value::as_object) {
            for (name, schema) in props {
                params.insert(
                    name.clone(),
                    ParamSpec {
                        ty: schema
                            .get("type")
                            .and_then(Value::as_str)
                            .map(ParamType::from_schema_type)
                            .unwrap_or(ParamType::Unknown),
                        required: required.iter().any(|r| r == name),
                        constraints: parse_constraints(schema),
                    },
                );
            }
        }

        Self {
            name: tool.name.trim().to_string(),
            description: tool.description.clone().unwrap_or_default(),
            params,
        }
    }

    /// Lower-cased name + description, the haystack for keyword detectors
    pub fn haystack(&self) -> String {
        format!("{} {}", self.name, self.description).to_lowercase()
    }
}

fn parse_constraints(schema: &Value) -> Constraints {
    Constraints {
        min_length: schema.get("minLength").and_then(Value::as_u64),
        max_length: schema.get("maxLength").and_then(Value::as_u64),
        minimum: schema.get("minimum").and_then(Value::as_f64),
        maximum: schema.get("maximum").and_then(Value::as_f64),
        enum_values: schema.get("enum").and_then(Value::as_array).map(|a| {
            a.iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        }),
        pattern: schema
            .get("pattern")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

/// A resource the target exposes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceCapability {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResourceCapability {
    pub fn from_resource(resource: &Resource) -> Self {
        Self {
            uri: resource.uri.clone(),
            name: resource.name.trim().to_string(),
            description: resource.description.clone(),
        }
    }
}

/// A prompt template the target exposes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptCapability {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
}

impl PromptCapability {
    pub fn from_prompt(prompt: &Prompt) -> Self {
        Self {
            name: prompt.name.trim().to_string(),
            description: prompt.description.clone(),
            arguments: prompt
                .arguments
                .as_ref()
                .map(|args| args.iter().map(|a| a.name.clone()).collect())
                .unwrap_or_default(),
        }
    }
}

/// One enumeration attempt against one target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSession {
    pub id: Uuid,
    pub target: String,
    pub transport: TransportKind,
    pub auth: AuthOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_info: Option<ServerInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthProbe>,
    pub tools: Vec<ToolCapability>,
    pub resources: Vec<ResourceCapability>,
    pub prompts: Vec<PromptCapability>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScanSession {
    pub fn new(target: &str, transport: TransportKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: target.to_string(),
            transport,
            auth: AuthOutcome::NotApplicable,
            server_info: None,
            health: None,
            tools: Vec::new(),
            resources: Vec::new(),
            prompts: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Whether the target URL speaks plain, unencrypted HTTP
    pub fn plaintext_http(&self) -> bool {
        self.target.starts_with("http://")
    }

    /// Whether the target is local to this machine
    pub fn is_local(&self) -> bool {
        self.target.contains("localhost") || self.target.contains("127.0.0.1")
    }

    pub fn capability_count(&self) -> usize {
        self.tools.len() + self.resources.len() + self.prompts.len()
    }

    pub fn finalize(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}
