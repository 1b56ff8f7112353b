//! Canonical security finding
//!
//! Every finding-producing path - the heuristic bank, external static
//! scanners, AI classification output - converges on this one shape before
//! scoring and deduplication.

use serde::{Deserialize, Serialize};

/// Severity level, ordered: INFO < LOW < MEDIUM < HIGH < CRITICAL
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Case-insensitive parse; `None` for anything outside the enum.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "INFO" => Some(Severity::Info),
            "LOW" => Some(Severity::Low),
            "MEDIUM" => Some(Severity::Medium),
            "HIGH" => Some(Severity::High),
            "CRITICAL" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The capability a finding is anchored to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum CapabilityRef {
    Tool(String),
    Resource(String),
    Prompt(String),
}

impl CapabilityRef {
    /// The identifier regardless of kind (tool name, resource URI, ...)
    pub fn identifier(&self) -> &str {
        match self {
            CapabilityRef::Tool(name) => name,
            CapabilityRef::Resource(uri) => uri,
            CapabilityRef::Prompt(name) => name,
        }
    }
}

/// One detected issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    /// Stable key such as `dangerous_capability` or `unbounded_input`
    pub category: String,
    /// Short human label
    pub title: String,
    /// Explanation of what was observed
    pub detail: String,
    /// Capability this finding is about, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<CapabilityRef>,
    /// File reference for findings imported from code scanners
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Weakness classifier, e.g. "CWE-78"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwe: Option<String>,
    pub recommendation: String,
    /// Provenance tags; grows to a union when findings merge
    pub sources: Vec<String>,
}

impl Finding {
    pub fn new(
        category: impl Into<String>,
        severity: Severity,
        title: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            title: title.into(),
            detail: detail.into(),
            capability: None,
            file: None,
            line: None,
            cwe: None,
            recommendation: String::new(),
            sources: Vec::new(),
        }
    }

    pub fn for_tool(mut self, name: impl Into<String>) -> Self {
        self.capability = Some(CapabilityRef::Tool(name.into()));
        self
    }

    pub fn for_resource(mut self, uri: impl Into<String>) -> Self {
        self.capability = Some(CapabilityRef::Resource(uri.into()));
        self
    }

    pub fn for_prompt(mut self, name: impl Into<String>) -> Self {
        self.capability = Some(CapabilityRef::Prompt(name.into()));
        self
    }

    pub fn with_cwe(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        let number = id.trim_start_matches("CWE-");
        self.cwe = Some(format!("CWE-{}", number));
        self
    }

    pub fn with_recommendation(mut self, text: impl Into<String>) -> Self {
        self.recommendation = text.into();
        self
    }

    pub fn with_source(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.sources.contains(&tag) {
            self.sources.push(tag);
        }
        self
    }

    pub fn at(mut self, file: impl Into<String>, line: Option<u32>) -> Self {
        self.file = Some(file.into());
        self.line = line;
        self
    }

    /// Location string used for dedup identity: the file reference when one
    /// exists, otherwise the capability identifier.
    pub fn location_key(&self) -> String {
        if let Some(ref file) = self.file {
            return file.clone();
        }
        self.capability
            .as_ref()
            .map(|c| c.identifier().to_string())
            .unwrap_or_default()
    }
}
