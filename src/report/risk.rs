//! Risk aggregation: severity histogram and ordinal rating
//!
//! The scoring model is an exact contract:
//! `score = 10*CRITICAL + 5*HIGH + 2*MEDIUM + 1*LOW` (INFO contributes 0),
//! rating CRITICAL at score >= 20, HIGH >= 10, MEDIUM >= 5, LOW >= 1,
//! otherwise CLEAN. Lower bounds are inclusive.

use serde::{Deserialize, Serialize};

use crate::scanner::finding::{Finding, Severity};

/// Count of findings per severity level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn tally(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }

    /// Severity-weighted sum; INFO carries no weight
    pub fn score(&self) -> u32 {
        (self.critical as u32) * 10
            + (self.high as u32) * 5
            + (self.medium as u32) * 2
            + (self.low as u32)
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.info
    }
}

/// Ordinal risk rating for a whole target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskRating {
    Clean,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskRating {
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 20 => RiskRating::Critical,
            s if s >= 10 => RiskRating::High,
            s if s >= 5 => RiskRating::Medium,
            s if s >= 1 => RiskRating::Low,
            _ => RiskRating::Clean,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskRating::Clean => "CLEAN",
            RiskRating::Low => "LOW",
            RiskRating::Medium => "MEDIUM",
            RiskRating::High => "HIGH",
            RiskRating::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for RiskRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Histogram + rating for a finding list. Never fails; an empty list rates
/// CLEAN.
pub fn assess(findings: &[Finding]) -> (SeverityCounts, RiskRating) {
    let counts = SeverityCounts::tally(findings);
    let rating = RiskRating::from_score(counts.score());
    (counts, rating)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn findings_of(severities: &[Severity]) -> Vec<Finding> {
        severities
            .iter()
            .enumerate()
            .map(|(i, &s)| Finding::new("cat", s, format!("finding {}", i), "detail"))
            .collect()
    }

    #[test]
    fn weights_are_exact() {
        let counts = SeverityCounts {
            critical: 1,
            high: 1,
            medium: 1,
            low: 1,
            info: 1,
        };
        assert_eq!(counts.score(), 10 + 5 + 2 + 1);
    }

    #[test]
    fn info_contributes_nothing() {
        let (counts, rating) = assess(&findings_of(&[Severity::Info, Severity::Info]));
        assert_eq!(counts.score(), 0);
        assert_eq!(rating, RiskRating::Clean);
    }

    #[test]
    fn one_critical_rates_high_not_critical() {
        // score 10: exactly the HIGH boundary
        let (counts, rating) = assess(&findings_of(&[Severity::Critical]));
        assert_eq!(counts.score(), 10);
        assert_eq!(rating, RiskRating::High);
    }

    #[test]
    fn two_criticals_rate_critical() {
        // score 20: exactly the CRITICAL boundary
        let (counts, rating) = assess(&findings_of(&[Severity::Critical, Severity::Critical]));
        assert_eq!(counts.score(), 20);
        assert_eq!(rating, RiskRating::Critical);
    }

    #[test]
    fn boundary_score_five_is_medium() {
        // one HIGH (5)
        let (counts, rating) = assess(&findings_of(&[Severity::High]));
        assert_eq!(counts.score(), 5);
        assert_eq!(rating, RiskRating::Medium);
    }

    #[test]
    fn boundary_score_one_is_low() {
        let (counts, rating) = assess(&findings_of(&[Severity::Low]));
        assert_eq!(counts.score(), 1);
        assert_eq!(rating, RiskRating::Low);
    }

    #[test]
    fn empty_list_is_clean() {
        let (counts, rating) = assess(&[]);
        assert_eq!(counts.total(), 0);
        assert_eq!(rating, RiskRating::Clean);
    }

    #[test]
    fn mixed_list_sums() {
        // 2 MEDIUM + 1 LOW = 5 -> MEDIUM
        let (counts, rating) = assess(&findings_of(&[
            Severity::Medium,
            Severity::Medium,
            Severity::Low,
        ]));
        assert_eq!(counts.score(), 5);
        assert_eq!(rating, RiskRating::Medium);
    }

    #[test]
    fn rating_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&RiskRating::Clean).unwrap(),
            "\"CLEAN\""
        );
        assert_eq!(
            serde_json::to_string(&RiskRating::Critical).unwrap(),
            "\"CRITICAL\""
        );
    }

    #[test]
    fn histogram_counts_all_levels() {
        let counts = SeverityCounts::tally(&findings_of(&[
            Severity::Critical,
            Severity::High,
            Severity::High,
            Severity::Medium,
            Severity::Low,
            Severity::Info,
        ]));
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.high, 2);
        assert_eq!(counts.medium, 1);
        assert_eq!(counts.low, 1);
        assert_eq!(counts.info, 1);
        assert_eq!(counts.total(), 6);
    }
}
