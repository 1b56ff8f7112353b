//! Scan engine - pipeline orchestration
//!
//! Enumerate (isolated) -> detector bank -> normalize external findings ->
//! dedup -> aggregate. Enumeration failures still yield a best-effort
//! report carrying exactly one diagnostic finding; capability data gathered
//! before a failure is never scored.

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::enumerator::{enumerate, enumerate_isolated, EnumerateRequest, ScanSession};
use crate::errors::EnumerateError;
use crate::report::{dedupe, normalize, DedupeOptions, RawFinding, RiskReport};
use crate::transport::TransportKind;

use super::checks::run_bank;
use super::finding::{Finding, Severity};
use super::keywords::DetectorConfig;

/// Pre-normalized findings from one external scanner or profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFindings {
    /// Provenance tag, e.g. "static-scanner" or "ai-owasp"
    pub source: String,
    pub findings: Vec<RawFinding>,
}

/// Scan configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Transport override; auto-detected from the URL when absent
    pub transport: Option<TransportKind>,
    pub bearer_token: Option<String>,
    pub timeout_secs: u64,
    pub detector: DetectorConfig,
    pub dedupe: DedupeOptions,
    /// Run enumeration in an isolated worker process. Disabled only in
    /// tests and by the worker itself.
    pub isolate: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            transport: None,
            bearer_token: None,
            timeout_secs: 30,
            detector: DetectorConfig::default(),
            dedupe: DedupeOptions::default(),
            isolate: true,
        }
    }
}

/// The scan pipeline for one or more targets
pub struct ScanEngine {
    config: ScanConfig,
}

impl ScanEngine {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Scan a single target, merging in any externally produced findings.
    pub async fn scan(&self, target: &str, external: Vec<SourceFindings>) -> RiskReport {
        let request = EnumerateRequest {
            target: target.to_string(),
            transport: self.config.transport,
            bearer_token: self.config.bearer_token.clone(),
            timeout_secs: self.config.timeout_secs,
        };

        let result = if self.config.isolate {
            enumerate_isolated(&request).await
        } else {
            enumerate(&request).await
        };

        match result {
            Ok(session) => self.assess_session(&session, external),
            Err(error) => self.error_report(&request, error),
        }
    }

    /// Scan several targets concurrently, one isolated worker each. Result
    /// order follows input order.
    pub async fn scan_all(&self, targets: &[String]) -> Vec<RiskReport> {
        let mut set = JoinSet::new();

        for (index, target) in targets.iter().enumerate() {
            let config = self.config.clone();
            let target = target.clone();
            set.spawn(async move {
                let report = ScanEngine::new(config).scan(&target, Vec::new()).await;
                (index, report)
            });
        }

        let mut indexed: Vec<(usize, RiskReport)> = Vec::with_capacity(targets.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(pair) => indexed.push(pair),
                Err(e) => tracing::error!("scan task failed: {}", e),
            }
        }
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, report)| report).collect()
    }

    /// The synchronous tail of the pipeline: detector bank, external merge,
    /// dedup, aggregation. Pure CPU, no blocking.
    pub fn assess_session(
        &self,
        session: &ScanSession,
        external: Vec<SourceFindings>,
    ) -> RiskReport {
        let mut findings = run_bank(session, &self.config.detector);
        findings.extend(normalize_external(external));

        let findings = dedupe(findings, &self.config.dedupe);
        RiskReport::build(session, findings)
    }

    /// A best-effort report for a target that could not be enumerated:
    /// empty capability lists plus exactly one diagnostic finding.
    fn error_report(&self, request: &EnumerateRequest, error: EnumerateError) -> RiskReport {
        let session = ScanSession::new(&request.target, request.transport_kind());

        let diagnostic = match &error {
            EnumerateError::Unreachable { message } => Finding::new(
                "scan_error",
                Severity::Info,
                "Enumeration failed: target unreachable",
                message.clone(),
            ),
            EnumerateError::Protocol { transport, message } => Finding::new(
                "scan_error",
                Severity::Info,
                "Enumeration failed: protocol error",
                format!("{} (transport: {})", message, transport),
            ),
        }
        .with_recommendation(
            "Verify the target address and transport; rerun the scan once the \
             endpoint is reachable.",
        )
        .with_source(super::checks::HEURISTIC_SOURCE);

        tracing::warn!("scan of {} failed: {}", request.target, error);
        RiskReport::build(&session, vec![diagnostic])
    }
}

/// Push every external record through the normalizer, logging any notes.
fn normalize_external(external: Vec<SourceFindings>) -> Vec<Finding> {
    let mut findings = Vec::new();

    for batch in external {
        for raw in batch.findings {
            let normalized = normalize(raw, Some(&batch.source));
            for note in &normalized.notes {
                tracing::debug!("normalization ({}): {}", batch.source, note);
            }
            findings.push(normalized.finding);
        }
    }

    findings
}

/// Merge-only entry point used when no live scan is involved: normalize and
/// dedup findings from external files.
pub fn merge_findings(external: Vec<SourceFindings>, options: &DedupeOptions) -> Vec<Finding> {
    dedupe(normalize_external(external), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumerator::{AuthOutcome, ToolCapability};
    use crate::protocol::Tool;
    use crate::report::{MergeStrategy, RiskRating, SimilarityOptions};

    fn engine() -> ScanEngine {
        ScanEngine::new(ScanConfig::default())
    }

    fn session_with_tool(name: &str, description: &str, schema: serde_json::Value) -> ScanSession {
        let mut session =
            ScanSession::new("https://api.example.com/mcp", TransportKind::StreamableHttp);
        session.auth = AuthOutcome::NotApplicable;
        session.tools = vec![ToolCapability::from_tool(&Tool {
            name: name.to_string(),
            description: Some(description.to_string()),
            input_schema: schema,
        })];
        session
    }

    #[test]
    fn unreachable_target_yields_single_diagnostic() {
        let request = EnumerateRequest::new("https://down.example/mcp");
        let report = engine().error_report(
            &request,
            EnumerateError::unreachable("enumeration timed out after 30s"),
        );

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].category, "scan_error");
        assert_eq!(report.summary.total_tools, 0);
        assert_eq!(report.summary.total_findings, 1);
        // INFO diagnostics carry no score weight.
        assert_eq!(report.summary.risk_score, RiskRating::Clean);
    }

    #[test]
    fn protocol_error_yields_single_diagnostic_with_transport() {
        let request = EnumerateRequest::new("https://odd.example/mcp");
        let report = engine().error_report(
            &request,
            EnumerateError::protocol("sse", "malformed tools listing"),
        );

        assert_eq!(report.findings.len(), 1);
        assert!(report.findings[0].detail.contains("sse"));
    }

    #[test]
    fn assess_session_runs_bank_and_scores() {
        let session = session_with_tool(
            "evaluate_expression",
            "Evaluate a mathematical expression",
            serde_json::json!({
                "type": "object",
                "properties": {"expression": {"type": "string"}},
                "required": ["expression"]
            }),
        );
        let report = engine().assess_session(&session, Vec::new());

        assert!(report
            .findings
            .iter()
            .any(|f| f.category == "dangerous_capability" && f.severity == Severity::Critical));
        assert!(report
            .findings
            .iter()
            .any(|f| f.category == "unbounded_input"));
    }

    #[test]
    fn external_findings_are_normalized_and_merged() {
        let session = session_with_tool(
            "add",
            "Adds two integers together safely",
            serde_json::json!({"type": "object", "properties": {}}),
        );
        let external = vec![SourceFindings {
            source: "static-scanner".to_string(),
            findings: vec![RawFinding {
                severity: Some("high".to_string()),
                rule_name: Some("Hardcoded credential".to_string()),
                file: Some("src/config.py".to_string()),
                line_number: Some(12),
                ..Default::default()
            }],
        }];

        let report = engine().assess_session(&session, external);
        let imported: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.source == "static-scanner")
            .collect();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].severity, Severity::High);
    }

    #[test]
    fn cross_source_merge_through_full_pipeline() {
        let mut config = ScanConfig::default();
        config.dedupe.similarity = Some(
            SimilarityOptions::new(0.7, MergeStrategy::KeepHighestSeverity).unwrap(),
        );
        let engine = ScanEngine::new(config);

        let session = session_with_tool(
            "add",
            "Adds two integers together safely",
            serde_json::json!({"type": "object", "properties": {}}),
        );
        let raw = |title: &str, line: u32, sev: &str| RawFinding {
            severity: Some(sev.to_string()),
            category: Some("injection".to_string()),
            title: Some(title.to_string()),
            file: Some("app/db.py".to_string()),
            line: Some(line),
            ..Default::default()
        };
        let external = vec![
            SourceFindings {
                source: "scanner-a".to_string(),
                findings: vec![raw("SQL Injection in query handler", 40, "HIGH")],
            },
            SourceFindings {
                source: "scanner-b".to_string(),
                findings: vec![raw("SQL injection via query parameter", 44, "MEDIUM")],
            },
        ];

        let report = engine.assess_session(&session, external);
        let merged: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.category == "injection")
            .collect();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].severity, Severity::High);
        assert!(merged[0].source.contains("scanner-a"));
        assert!(merged[0].source.contains("scanner-b"));
    }

    #[test]
    fn merge_findings_without_a_scan() {
        let external = vec![
            SourceFindings {
                source: "a".to_string(),
                findings: vec![RawFinding {
                    severity: Some("LOW".to_string()),
                    title: Some("dup".to_string()),
                    file: Some("f.py".to_string()),
                    line: Some(1),
                    ..Default::default()
                }],
            },
            SourceFindings {
                source: "b".to_string(),
                findings: vec![RawFinding {
                    severity: Some("LOW".to_string()),
                    title: Some("dup".to_string()),
                    file: Some("f.py".to_string()),
                    line: Some(1),
                    ..Default::default()
                }],
            },
        ];

        // Exact phase drops the byte-equal duplicate even with similarity off.
        let merged = merge_findings(external, &DedupeOptions::default());
        assert_eq!(merged.len(), 1);
    }
}
