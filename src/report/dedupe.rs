//! Cross-source deduplication
//!
//! Two independent phases:
//!
//! 1. Exact-match dedup ALWAYS runs. It only removes true duplicates
//!    (same location, category, title and line) and is safe unconditionally.
//! 2. Similarity merge runs only when the caller opts in AND the findings
//!    carry more than one distinct source tag - it is heuristic and lossy,
//!    so it stays off unless several scanners could plausibly redescribe
//!    the same root cause.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::scanner::finding::Finding;
use crate::scanner::keywords::SECURITY_VOCABULARY;

/// Line distance within which two findings can describe the same issue
const LINE_WINDOW: i64 = 5;

/// Shared security-vocabulary terms required by the similarity predicate
const MIN_SHARED_TERMS: usize = 2;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// How a dedupe group collapses into one finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Keep the member with the greatest severity, ties broken by earliest
    /// input position
    #[default]
    KeepHighestSeverity,
    /// Keep the first member seen
    KeepFirst,
    /// Keep the highest severity and concatenate distinct recommendations
    MergeAll,
}

impl FromStr for MergeStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "keep_highest_severity" => Ok(MergeStrategy::KeepHighestSeverity),
            "keep_first" => Ok(MergeStrategy::KeepFirst),
            "merge_all" | "merge" => Ok(MergeStrategy::MergeAll),
            other => Err(ConfigError::UnknownStrategy {
                value: other.to_string(),
            }),
        }
    }
}

/// Opt-in similarity configuration
#[derive(Debug, Clone)]
pub struct SimilarityOptions {
    threshold: f64,
    pub strategy: MergeStrategy,
}

impl SimilarityOptions {
    /// Threshold must fall in (0, 1].
    pub fn new(threshold: f64, strategy: MergeStrategy) -> Result<Self, ConfigError> {
        if threshold <= 0.0 || threshold > 1.0 || threshold.is_nan() {
            return Err(ConfigError::InvalidThreshold { value: threshold });
        }
        Ok(Self {
            threshold,
            strategy,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            strategy: MergeStrategy::default(),
        }
    }
}

/// Full dedup configuration
#[derive(Debug, Clone, Default)]
pub struct DedupeOptions {
    /// `None` = exact-match phase only (the default behavior)
    pub similarity: Option<SimilarityOptions>,
}

/// Run the dedup pipeline: mandatory exact phase, then the similarity phase
/// when opted in and meaningful.
pub fn dedupe(findings: Vec<Finding>, options: &DedupeOptions) -> Vec<Finding> {
    let findings = exact_dedupe(findings);

    match &options.similarity {
        Some(similarity) if distinct_source_count(&findings) > 1 => {
            similarity_merge(findings, similarity)
        }
        _ => findings,
    }
}

/// Phase 1: drop byte-equal duplicates by identity key. First wins.
pub fn exact_dedupe(findings: Vec<Finding>) -> Vec<Finding> {
    let mut seen: HashSet<(String, String, String, u32)> = HashSet::new();
    let mut kept = Vec::with_capacity(findings.len());

    for finding in findings {
        let key = (
            finding.location_key().to_lowercase(),
            finding.category.to_lowercase(),
            finding.title.trim().to_lowercase(),
            finding.line.unwrap_or(0),
        );
        if seen.insert(key) {
            kept.push(finding);
        }
    }

    kept
}

/// Phase 2: cluster transitively-similar findings and collapse each cluster.
pub fn similarity_merge(findings: Vec<Finding>, options: &SimilarityOptions) -> Vec<Finding> {
    if findings.len() < 2 {
        return findings;
    }

    // Union-find over finding indices; similarity is applied pairwise and
    // groups form transitively.
    let mut parent: Vec<usize> = (0..findings.len()).collect();

    fn root(parent: &mut Vec<usize>, mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..findings.len() {
        for j in (i + 1)..findings.len() {
            if are_similar(&findings[i], &findings[j], options.threshold) {
                let (ri, rj) = (root(&mut parent, i), root(&mut parent, j));
                if ri != rj {
                    parent[rj.max(ri)] = rj.min(ri);
                }
            }
        }
    }

    // Collect groups in order of their first member.
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of_root: std::collections::HashMap<usize, usize> =
        std::collections::HashMap::new();
    for i in 0..findings.len() {
        let r = root(&mut parent, i);
        match group_of_root.get(&r) {
            Some(&g) => groups[g].push(i),
            None => {
                group_of_root.insert(r, groups.len());
                groups.push(vec![i]);
            }
        }
    }

    let mut merged = Vec::with_capacity(groups.len());
    for group in groups {
        merged.push(collapse(&findings, &group, options.strategy));
    }
    merged
}

/// Collapse one dedupe group into a single finding. The merged finding's
/// sources become the union of every member's tags.
fn collapse(findings: &[Finding], group: &[usize], strategy: MergeStrategy) -> Finding {
    if group.len() == 1 {
        return findings[group[0]].clone();
    }

    let chosen = match strategy {
        MergeStrategy::KeepFirst => group[0],
        MergeStrategy::KeepHighestSeverity | MergeStrategy::MergeAll => {
            let mut best = group[0];
            for &idx in &group[1..] {
                if findings[idx].severity > findings[best].severity {
                    best = idx;
                }
            }
            best
        }
    };

    let mut merged = findings[chosen].clone();

    let mut sources: Vec<String> = Vec::new();
    for &idx in group {
        for tag in &findings[idx].sources {
            if !sources.contains(tag) {
                sources.push(tag.clone());
            }
        }
    }
    merged.sources = sources;

    if strategy == MergeStrategy::MergeAll {
        let mut recommendations: Vec<String> = Vec::new();
        for &idx in group {
            let rec = findings[idx].recommendation.trim();
            if !rec.is_empty() && !recommendations.iter().any(|r| r == rec) {
                recommendations.push(rec.to_string());
            }
        }
        merged.recommendation = recommendations.join(" | ");
    }

    merged
}

/// The similarity predicate: same location, close lines, and either equal
/// normalized titles or a similarity score above threshold backed by shared
/// security vocabulary.
fn are_similar(a: &Finding, b: &Finding, threshold: f64) -> bool {
    if a.location_key().to_lowercase() != b.location_key().to_lowercase() {
        return false;
    }

    let line_a = a.line.unwrap_or(0) as i64;
    let line_b = b.line.unwrap_or(0) as i64;
    if (line_a - line_b).abs() > LINE_WINDOW {
        return false;
    }

    let title_a = normalize_title(&a.title);
    let title_b = normalize_title(&b.title);
    if title_a.is_empty() || title_b.is_empty() {
        return false;
    }
    if title_a == title_b {
        return true;
    }

    let score = strsim::normalized_levenshtein(&title_a, &title_b);
    score >= threshold && shared_terms(&title_a, &title_b) >= MIN_SHARED_TERMS
}

/// Lower-cased, whitespace-collapsed title
fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Number of security-vocabulary terms appearing in both titles
fn shared_terms(a: &str, b: &str) -> usize {
    SECURITY_VOCABULARY
        .iter()
        .filter(|term| a.contains(*term) && b.contains(*term))
        .count()
}

fn distinct_source_count(findings: &[Finding]) -> usize {
    let mut tags: HashSet<&str> = HashSet::new();
    for finding in findings {
        for tag in &finding.sources {
            tags.insert(tag.as_str());
        }
    }
    tags.len()
}
