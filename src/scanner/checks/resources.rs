//! Resource exposure checks: sensitive-looking URIs/names and local
//! filesystem schemes.

use crate::enumerator::ScanSession;
use crate::scanner::finding::{Finding, Severity};
use crate::scanner::keywords::DetectorConfig;

pub fn check_resource_exposure(session: &ScanSession, config: &DetectorConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    for resource in &session.resources {
        let haystack = format!("{} {}", resource.uri, resource.name).to_lowercase();

        if let Some(marker) = config
            .sensitive_resources
            .iter()
            .find(|p| haystack.contains(*p))
        {
            findings.push(
                Finding::new(
                    "resource_exposure",
                    Severity::High,
                    format!("Sensitive resource exposed: '{}'", resource.name),
                    format!(
                        "Resource URI or name matches the sensitive marker '{}' (uri: {}).",
                        marker, resource.uri
                    ),
                )
                .for_resource(&resource.uri)
                .with_cwe("200")
                .with_recommendation(
                    "Do not expose secrets or key material as listable resources; serve \
                     non-sensitive derived data instead.",
                ),
            );
        }

        if resource.uri.to_lowercase().starts_with("file://") {
            findings.push(
                Finding::new(
                    "resource_exposure",
                    Severity::Medium,
                    format!("Local file resource: '{}'", resource.name),
                    format!(
                        "Resource '{}' is served straight off the local filesystem, coupling \
                         the server's host layout to its protocol surface.",
                        resource.uri
                    ),
                )
                .for_resource(&resource.uri)
                .with_cwe("552")
                .with_recommendation(
                    "Serve file content through a scoped abstraction rather than raw file:// \
                     URIs, and confine it to an allowlisted directory.",
                ),
            );
        }
    }

    findings
}
