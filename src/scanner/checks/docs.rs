//! Documentation quality: a tool nobody can read about is a tool nobody
//! can audit.

use crate::enumerator::ScanSession;
use crate::scanner::finding::{Finding, Severity};
use crate::scanner::keywords::DetectorConfig;

pub fn check_documentation(session: &ScanSession, config: &DetectorConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    for tool in &session.tools {
        let desc = tool.description.trim();
        if desc.len() < config.min_description_len {
            let what = if desc.is_empty() {
                "no description".to_string()
            } else {
                format!("a near-empty description ({} chars)", desc.len())
            };

            findings.push(
                Finding::new(
                    "documentation",
                    Severity::Low,
                    format!("Tool '{}' has {}", tool.name, what),
                    "Undocumented tools cannot be reviewed for intended behavior, and \
                     description changes that would signal a rug pull go unnoticed.",
                )
                .for_tool(&tool.name)
                .with_cwe("1059")
                .with_recommendation(
                    "Describe what the tool does, its side effects and its expected inputs.",
                ),
            );
        }
    }

    findings
}
