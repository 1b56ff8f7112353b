//! Risk report assembly and output
//!
//! The report is the one shape downstream consumers (renderers, CI
//! integrations) see: capability digests, the post-dedup finding list, a
//! severity histogram and the ordinal risk rating.

pub mod dedupe;
pub mod normalize;
pub mod risk;

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enumerator::{HealthProbe, ScanSession};
use crate::scanner::finding::{CapabilityRef, Finding, Severity};
use crate::ui::{OutputMode, Printer};

pub use dedupe::{
    dedupe, exact_dedupe, similarity_merge, DedupeOptions, MergeStrategy, SimilarityOptions,
    DEFAULT_SIMILARITY_THRESHOLD,
};
pub use normalize::{normalize, NormalizedFinding, RawFinding};
pub use risk::{assess, RiskRating, SeverityCounts};

/// Server block of the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportServerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub capabilities: Value,
    pub health: Option<HealthProbe>,
}

/// Tool digest: name, description and parameter names only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDigest {
    pub name: String,
    pub description: String,
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDigest {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDigest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub arguments: Vec<String>,
}

/// One finding as rendered in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportFinding {
    pub severity: Severity,
    pub category: String,
    pub title: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    pub cwe: Option<String>,
    pub recommendation: String,
    pub source: String,
}

impl From<&Finding> for ReportFinding {
    fn from(finding: &Finding) -> Self {
        let (tool, resource) = match &finding.capability {
            Some(CapabilityRef::Tool(name)) | Some(CapabilityRef::Prompt(name)) => {
                (Some(name.clone()), None)
            }
            Some(CapabilityRef::Resource(uri)) => (None, Some(uri.clone())),
            None => (None, None),
        };

        Self {
            severity: finding.severity,
            category: finding.category.clone(),
            title: finding.title.clone(),
            detail: finding.detail.clone(),
            tool,
            resource,
            cwe: finding.cwe.clone(),
            recommendation: finding.recommendation.clone(),
            source: finding.sources.join(", "),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_tools: usize,
    pub total_resources: usize,
    pub total_prompts: usize,
    pub total_findings: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub risk_score: RiskRating,
}

/// The scored report for one target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    pub target: String,
    /// "sse" | "http"
    pub transport: String,
    pub server_info: ReportServerInfo,
    pub tools: Vec<ToolDigest>,
    pub resources: Vec<ResourceDigest>,
    pub prompts: Vec<PromptDigest>,
    pub findings: Vec<ReportFinding>,
    pub summary: ReportSummary,
    pub generated_at: DateTime<Utc>,
}

impl RiskReport {
    /// Assemble the report from a finalized session and its post-dedup
    /// finding list.
    pub fn build(session: &ScanSession, findings: Vec<Finding>) -> Self {
        let (counts, rating) = assess(&findings);

        let mut by_severity = BTreeMap::new();
        by_severity.insert("CRITICAL".to_string(), counts.critical);
        by_severity.insert("HIGH".to_string(), counts.high);
        by_severity.insert("MEDIUM".to_string(), counts.medium);
        by_severity.insert("LOW".to_string(), counts.low);
        by_severity.insert("INFO".to_string(), counts.info);

        Self {
            target: session.target.clone(),
            transport: session.transport.wire_name().to_string(),
            server_info: ReportServerInfo {
                name: session.server_info.as_ref().map(|i| i.name.clone()),
                version: session.server_info.as_ref().map(|i| i.version.clone()),
                capabilities: session
                    .server_info
                    .as_ref()
                    .and_then(|i| serde_json::to_value(&i.capabilities).ok())
                    .unwrap_or(Value::Null),
                health: session.health.clone(),
            },
            tools: session
                .tools
                .iter()
                .map(|t| ToolDigest {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.params.keys().cloned().collect(),
                })
                .collect(),
            resources: session
                .resources
                .iter()
                .map(|r| ResourceDigest {
                    uri: r.uri.clone(),
                    name: r.name.clone(),
                    description: r.description.clone(),
                })
                .collect(),
            prompts: session
                .prompts
                .iter()
                .map(|p| PromptDigest {
                    name: p.name.clone(),
                    description: p.description.clone(),
                    arguments: p.arguments.clone(),
                })
                .collect(),
            summary: ReportSummary {
                total_tools: session.tools.len(),
                total_resources: session.resources.len(),
                total_prompts: session.prompts.len(),
                total_findings: findings.len(),
                by_severity,
                risk_score: rating,
            },
            findings: findings.iter().map(ReportFinding::from).collect(),
            generated_at: Utc::now(),
        }
    }

    pub fn print_json(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }

    /// Formatted text output, mode-aware
    pub fn print_text(&self, mode: OutputMode) {
        let printer = Printer::with_mode(mode);

        printer.header("Scan Report");
        printer.separator();
        printer.kv("Target", &self.target);
        printer.kv("Transport", &self.transport);
        if let Some(ref name) = self.server_info.name {
            let version = self.server_info.version.as_deref().unwrap_or("?");
            printer.kv("Server", &format!("{} v{}", name, version));
        }
        printer.kv(
            "Capabilities",
            &format!(
                "{} tools, {} resources, {} prompts",
                self.summary.total_tools, self.summary.total_resources, self.summary.total_prompts
            ),
        );
        printer.newline();

        if self.findings.is_empty() {
            printer.success("No findings.");
        } else {
            for finding in &self.findings {
                let severity = if mode.colors_enabled() {
                    match finding.severity {
                        Severity::Critical | Severity::High => {
                            finding.severity.as_str().red().bold().to_string()
                        }
                        Severity::Medium => finding.severity.as_str().yellow().to_string(),
                        Severity::Low => finding.severity.as_str().blue().to_string(),
                        Severity::Info => finding.severity.as_str().dimmed().to_string(),
                    }
                } else {
                    finding.severity.as_str().to_string()
                };

                println!("  [{}] {} ({})", severity, finding.title, finding.category);
                println!("    {}", finding.detail);
                if let Some(ref tool) = finding.tool {
                    println!("    Tool: {}", tool);
                }
                if let Some(ref resource) = finding.resource {
                    println!("    Resource: {}", resource);
                }
                if let Some(ref cwe) = finding.cwe {
                    println!("    Reference: {}", cwe);
                }
                if !finding.recommendation.is_empty() {
                    let fix = if mode.colors_enabled() {
                        finding.recommendation.green().to_string()
                    } else {
                        finding.recommendation.clone()
                    };
                    println!("    Fix: {}", fix);
                }
                printer.newline();
            }
        }

        printer.separator();
        println!(
            "Summary: {} critical, {} high, {} medium, {} low, {} info",
            self.summary.by_severity.get("CRITICAL").unwrap_or(&0),
            self.summary.by_severity.get("HIGH").unwrap_or(&0),
            self.summary.by_severity.get("MEDIUM").unwrap_or(&0),
            self.summary.by_severity.get("LOW").unwrap_or(&0),
            self.summary.by_severity.get("INFO").unwrap_or(&0),
        );

        match self.summary.risk_score {
            RiskRating::Critical | RiskRating::High => printer.error(&format!(
                "Risk rating: {}",
                self.summary.risk_score
            )),
            RiskRating::Clean => printer.success("Risk rating: CLEAN"),
            _ => printer.warning(&format!("Risk rating: {}", self.summary.risk_score)),
        }
    }
}
