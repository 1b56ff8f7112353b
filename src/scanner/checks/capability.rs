//! Tool-level capability checks: dangerous keyword families, excessive
//! permission scope, and duplicate-name shadowing.

use std::collections::{BTreeSet, HashMap};

use crate::enumerator::ScanSession;
use crate::scanner::finding::{Finding, Severity};
use crate::scanner::keywords::{AccessKind, DetectorConfig};

/// One finding per (tool, matched keyword family). The family's severity is
/// fixed configuration, not per-keyword.
pub fn check_dangerous_capabilities(session: &ScanSession, config: &DetectorConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    for tool in &session.tools {
        let haystack = tool.haystack();

        for family in &config.families {
            let matched = family.keywords.iter().find(|k| haystack.contains(*k));
            if let Some(keyword) = matched {
                let mut finding = Finding::new(
                    "dangerous_capability",
                    family.severity,
                    format!("Tool '{}' exposes {}", tool.name, family.label),
                    format!(
                        "Tool name or description matched the '{}' keyword family (keyword: '{}'). \
                         Description: {}",
                        family.key,
                        keyword,
                        truncate(&tool.description, 200)
                    ),
                )
                .for_tool(&tool.name)
                .with_recommendation(
                    "Confirm this capability is intended to be exposed; restrict it behind \
                     allowlists or remove it from untrusted deployments.",
                );
                if let Some(cwe) = family.cwe {
                    finding = finding.with_cwe(cwe);
                }
                findings.push(finding);
            }
        }
    }

    findings
}

/// A single tool combining two or more of {read, write, delete} gets one
/// extra HIGH finding: the combination is the signal, on top of whatever
/// the per-family check already reported.
pub fn check_excessive_permissions(session: &ScanSession, config: &DetectorConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    for tool in &session.tools {
        let haystack = tool.haystack();

        let matched: BTreeSet<AccessKind> = config
            .access_families
            .iter()
            .filter(|family| family.keywords.iter().any(|k| haystack.contains(*k)))
            .map(|family| family.kind)
            .collect();

        if matched.len() >= 2 {
            let kinds: Vec<&str> = matched
                .iter()
                .map(|k| match k {
                    AccessKind::Read => "read",
                    AccessKind::Write => "write",
                    AccessKind::Delete => "delete",
                })
                .collect();

            findings.push(
                Finding::new(
                    "excessive_permissions",
                    Severity::High,
                    format!("Tool '{}' combines {} access", tool.name, kinds.join("+")),
                    format!(
                        "A single tool spanning multiple access scopes ({}) concentrates more \
                         authority than any one operation needs.",
                        kinds.join(", ")
                    ),
                )
                .for_tool(&tool.name)
                .with_cwe("250")
                .with_recommendation(
                    "Split the tool into narrowly scoped operations so each can be granted \
                     or denied independently.",
                ),
            );
        }
    }

    findings
}

/// Duplicate tool names within one session. Enumeration preserves the
/// duplicates; the ambiguity itself is what gets flagged.
pub fn check_tool_shadowing(session: &ScanSession, _config: &DetectorConfig) -> Vec<Finding> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tool in &session.tools {
        *counts.entry(tool.name.as_str()).or_default() += 1;
    }

    let mut duplicated: Vec<(&str, usize)> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .collect();
    duplicated.sort();

    duplicated
        .into_iter()
        .map(|(name, count)| {
            Finding::new(
                "tool_shadowing",
                Severity::Medium,
                format!("Tool name '{}' is declared {} times", name, count),
                "Duplicate tool names make it ambiguous which implementation an AI client \
                 will invoke, enabling one definition to shadow another.",
            )
            .for_tool(name)
            .with_cwe("1021")
            .with_recommendation("Give every tool a unique name within the server.")
        })
        .collect()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
