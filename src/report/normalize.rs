//! Finding normalizer
//!
//! Every finding-producing collaborator (static-rule scanners, AI
//! classification output, older report formats) funnels through this one
//! total mapping before merge. Field aliases resolve by a fixed priority,
//! never per call site:
//!
//! - title:          title > rule_name > category > "Untitled finding"
//! - detail:         detail > description > explanation > recommendation
//! - recommendation: recommendation > fix > explanation > description
//! - line:           line_number > line
//! - severity:       case-insensitive parse; unrecognized or missing
//!                   defaults to LOW with a recorded note
//!
//! Normalization never fails and is idempotent: a canonical finding mapped
//! back through `RawFinding` normalizes to itself.

use serde::{Deserialize, Serialize};

use crate::scanner::finding::{CapabilityRef, Finding, Severity};

/// A finding record of unknown or variable shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFinding {
    pub severity: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub rule_name: Option<String>,
    pub detail: Option<String>,
    pub description: Option<String>,
    pub explanation: Option<String>,
    pub recommendation: Option<String>,
    pub fix: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub line_number: Option<u32>,
    pub tool: Option<String>,
    pub resource: Option<String>,
    pub cwe: Option<String>,
    pub source: Option<String>,
}

/// Outcome of normalizing one raw record
#[derive(Debug, Clone)]
pub struct NormalizedFinding {
    pub finding: Finding,
    /// Diagnostics recorded while defaulting fields, e.g. an unrecognized
    /// severity string
    pub notes: Vec<String>,
}

/// Map a raw record into the canonical shape. `default_source` tags records
/// whose producer did not tag them itself.
pub fn normalize(raw: RawFinding, default_source: Option<&str>) -> NormalizedFinding {
    let mut notes = Vec::new();

    let severity = match raw.severity.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => match Severity::parse(s) {
            Some(sev) => sev,
            None => {
                notes.push(format!("unrecognized severity '{}', defaulted to LOW", s));
                Severity::Low
            }
        },
        _ => {
            notes.push("missing severity, defaulted to LOW".to_string());
            Severity::Low
        }
    };

    let category = raw
        .category
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("uncategorized")
        .to_string();

    let title = first_present(&[&raw.title, &raw.rule_name, &raw.category])
        .unwrap_or_else(|| "Untitled finding".to_string());

    let detail = first_present(&[
        &raw.detail,
        &raw.description,
        &raw.explanation,
        &raw.recommendation,
    ])
    .unwrap_or_default();

    let recommendation = first_present(&[
        &raw.recommendation,
        &raw.fix,
        &raw.explanation,
        &raw.description,
    ])
    .unwrap_or_default();

    let capability = match (&raw.tool, &raw.resource) {
        (Some(tool), _) if !tool.trim().is_empty() => {
            Some(CapabilityRef::Tool(tool.trim().to_string()))
        }
        (_, Some(resource)) if !resource.trim().is_empty() => {
            Some(CapabilityRef::Resource(resource.trim().to_string()))
        }
        _ => None,
    };

    let source = raw
        .source
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| default_source.map(str::to_string))
        .unwrap_or_else(|| "external".to_string());

    let finding = Finding {
        severity,
        category,
        title,
        detail,
        capability,
        file: raw.file.as_deref().map(normalize_file_ref),
        line: raw.line_number.or(raw.line),
        cwe: raw
            .cwe
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("CWE-{}", s.trim_start_matches("CWE-"))),
        recommendation,
        sources: vec![source],
    };

    NormalizedFinding { finding, notes }
}

/// First non-empty alias, trimmed
fn first_present(candidates: &[&Option<String>]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Collapse Windows-style and Path-derived references onto one shape
fn normalize_file_ref(file: &str) -> String {
    file.trim().replace('\\', "/")
}

impl From<&Finding> for RawFinding {
    fn from(finding: &Finding) -> Self {
        let (tool, resource) = match &finding.capability {
            Some(CapabilityRef::Tool(name)) | Some(CapabilityRef::Prompt(name)) => {
                (Some(name.clone()), None)
            }
            Some(CapabilityRef::Resource(uri)) => (None, Some(uri.clone())),
            None => (None, None),
        };

        RawFinding {
            severity: Some(finding.severity.as_str().to_string()),
            category: Some(finding.category.clone()),
            title: Some(finding.title.clone()),
            rule_name: None,
            detail: Some(finding.detail.clone()),
            description: None,
            explanation: None,
            recommendation: Some(finding.recommendation.clone()),
            fix: None,
            file: finding.file.clone(),
            line: finding.line,
            line_number: finding.line,
            tool,
            resource,
            cwe: finding.cwe.clone(),
            source: finding.sources.first().cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_by_priority() {
        let raw = RawFinding {
            severity: Some("high".to_string()),
            rule_name: Some("sql-injection".to_string()),
            fix: Some("Use prepared statements".to_string()),
            description: Some("Query built by concatenation".to_string()),
            ..Default::default()
        };

        let n = normalize(raw, Some("static-scanner"));
        assert_eq!(n.finding.severity, Severity::High);
        assert_eq!(n.finding.title, "sql-injection");
        assert_eq!(n.finding.detail, "Query built by concatenation");
        assert_eq!(n.finding.recommendation, "Use prepared statements");
        assert_eq!(n.finding.sources, vec!["static-scanner"]);
        assert!(n.notes.is_empty());
    }

    #[test]
    fn recommendation_prefers_explicit_field() {
        let raw = RawFinding {
            severity: Some("LOW".to_string()),
            title: Some("t".to_string()),
            recommendation: Some("explicit".to_string()),
            fix: Some("fix".to_string()),
            explanation: Some("explanation".to_string()),
            ..Default::default()
        };
        assert_eq!(normalize(raw, None).finding.recommendation, "explicit");
    }

    #[test]
    fn unrecognized_severity_defaults_to_low_with_note() {
        let raw = RawFinding {
            severity: Some("BANANAS".to_string()),
            title: Some("t".to_string()),
            ..Default::default()
        };
        let n = normalize(raw, None);
        assert_eq!(n.finding.severity, Severity::Low);
        assert_eq!(n.notes.len(), 1);
        assert!(n.notes[0].contains("BANANAS"));
    }

    #[test]
    fn missing_severity_defaults_to_low_with_note() {
        let n = normalize(RawFinding::default(), None);
        assert_eq!(n.finding.severity, Severity::Low);
        assert!(!n.notes.is_empty());
    }

    #[test]
    fn severity_case_is_normalized() {
        for variant in ["critical", "Critical", "CRITICAL", " cRiTiCaL "] {
            let raw = RawFinding {
                severity: Some(variant.to_string()),
                title: Some("t".to_string()),
                ..Default::default()
            };
            assert_eq!(normalize(raw, None).finding.severity, Severity::Critical);
        }
    }

    #[test]
    fn line_number_wins_over_line() {
        let raw = RawFinding {
            severity: Some("LOW".to_string()),
            title: Some("t".to_string()),
            line: Some(10),
            line_number: Some(42),
            ..Default::default()
        };
        assert_eq!(normalize(raw, None).finding.line, Some(42));
    }

    #[test]
    fn windows_paths_are_normalized() {
        let raw = RawFinding {
            severity: Some("LOW".to_string()),
            title: Some("t".to_string()),
            file: Some(r"src\handlers\db.py".to_string()),
            ..Default::default()
        };
        assert_eq!(
            normalize(raw, None).finding.file.as_deref(),
            Some("src/handlers/db.py")
        );
    }

    #[test]
    fn missing_fields_get_defaults() {
        let n = normalize(RawFinding::default(), None);
        assert_eq!(n.finding.title, "Untitled finding");
        assert_eq!(n.finding.category, "uncategorized");
        assert_eq!(n.finding.sources, vec!["external"]);
        assert!(n.finding.detail.is_empty());
    }

    #[test]
    fn cwe_prefix_is_added() {
        let raw = RawFinding {
            severity: Some("LOW".to_string()),
            title: Some("t".to_string()),
            cwe: Some("89".to_string()),
            ..Default::default()
        };
        assert_eq!(normalize(raw, None).finding.cwe.as_deref(), Some("CWE-89"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let raw = RawFinding {
            severity: Some("high".to_string()),
            category: Some("injection".to_string()),
            rule_name: Some("SQLi in handler".to_string()),
            description: Some("concatenated query".to_string()),
            fix: Some("parameterize".to_string()),
            file: Some(r"app\db.py".to_string()),
            line: Some(40),
            source: Some("scanner-a".to_string()),
            ..Default::default()
        };

        let once = normalize(raw, None).finding;
        let twice = normalize(RawFinding::from(&once), None).finding;

        assert_eq!(once.severity, twice.severity);
        assert_eq!(once.category, twice.category);
        assert_eq!(once.title, twice.title);
        assert_eq!(once.detail, twice.detail);
        assert_eq!(once.recommendation, twice.recommendation);
        assert_eq!(once.file, twice.file);
        assert_eq!(once.line, twice.line);
        assert_eq!(once.sources, twice.sources);
    }

    #[test]
    fn tool_reference_survives() {
        let raw = RawFinding {
            severity: Some("HIGH".to_string()),
            title: Some("t".to_string()),
            tool: Some("shell_exec".to_string()),
            ..Default::default()
        };
        let n = normalize(raw, None);
        assert_eq!(
            n.finding.capability,
            Some(CapabilityRef::Tool("shell_exec".to_string()))
        );
    }
}
