//! Session-level transport and authentication checks.

use crate::enumerator::{AuthOutcome, ScanSession};
use crate::scanner::finding::{Finding, Severity};
use crate::scanner::keywords::DetectorConfig;

/// Plain HTTP to a non-local target: everything, tool calls included,
/// crosses the network in the clear.
pub fn check_transport_security(session: &ScanSession, _config: &DetectorConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    if session.plaintext_http() && !session.is_local() {
        findings.push(
            Finding::new(
                "transport_security",
                Severity::Medium,
                "Unencrypted HTTP transport",
                format!(
                    "Target '{}' is reached over plain HTTP; protocol traffic can be read \
                     and altered in transit.",
                    session.target
                ),
            )
            .with_cwe("319")
            .with_recommendation("Serve the MCP endpoint over HTTPS with a valid certificate."),
        );
    }

    findings
}

/// Authentication posture. Only the accepted-without-credentials case is a
/// problem; a rejection is recorded as an affirmative signal, and a scan
/// that authenticated with a caller-supplied token proves nothing either way.
pub fn check_authentication(session: &ScanSession, _config: &DetectorConfig) -> Vec<Finding> {
    match session.auth {
        AuthOutcome::AcceptedWithoutCredentials => vec![Finding::new(
            "authentication",
            Severity::High,
            "No authentication required",
            format!(
                "Capability listing on '{}' succeeded with zero credentials presented. \
                 Anyone who can reach the endpoint can enumerate and invoke its tools.",
                session.target
            ),
        )
        .with_cwe("306")
        .with_recommendation(
            "Require authentication (OAuth 2.0, bearer tokens or mTLS) on every \
             remote-facing MCP endpoint.",
        )],
        AuthOutcome::Rejected => vec![Finding::new(
            "authentication",
            Severity::Info,
            "Authentication enforced",
            format!(
                "Target '{}' rejected the unauthenticated session. Credentials are \
                 required before any capability is revealed.",
                session.target
            ),
        )
        .with_recommendation("No action needed.")],
        AuthOutcome::NotApplicable => Vec::new(),
    }
}
