//! Parameter-schema checks: unconstrained risky inputs and credential
//! parameters.

use crate::enumerator::{ParamSpec, ScanSession};
use crate::scanner::finding::{Finding, Severity};
use crate::scanner::keywords::DetectorConfig;

/// At most one finding per parameter from this check, the most specific
/// rule that applies:
/// 1. risky name (path / injection-prone / network) with no declared
///    constraint - MEDIUM
/// 2. required string with no maxLength/enum/pattern - LOW
/// 3. required integer/number with no minimum/maximum - LOW
pub fn check_parameter_constraints(session: &ScanSession, config: &DetectorConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    for tool in &session.tools {
        for (name, spec) in &tool.params {
            let name_lower = name.to_lowercase();

            if let Some(group) = risky_group(&name_lower, config) {
                if !spec.constraints.any() {
                    findings.push(
                        Finding::new(
                            "unbounded_input",
                            Severity::Medium,
                            format!(
                                "Unconstrained {} parameter '{}' in tool '{}'",
                                group, name, tool.name
                            ),
                            format!(
                                "Parameter '{}' takes {} input with no enum, pattern, length or \
                                 range constraint declared, leaving the full value space open to \
                                 an attacker.",
                                name, group
                            ),
                        )
                        .for_tool(&tool.name)
                        .with_cwe("20")
                        .with_recommendation(
                            "Declare the tightest constraint the tool can honor: an enum of \
                             allowed values, a pattern, or explicit bounds.",
                        ),
                    );
                    continue;
                }
            }

            if spec.required && !is_bounded(spec) {
                let (label, cwe) = if spec.ty.is_numeric() {
                    ("numeric", "20")
                } else if spec.ty == crate::enumerator::ParamType::String {
                    ("string", "1284")
                } else {
                    continue;
                };

                findings.push(
                    Finding::new(
                        "unbounded_input",
                        Severity::Low,
                        format!(
                            "Required {} parameter '{}' in tool '{}' is unbounded",
                            label, name, tool.name
                        ),
                        format!(
                            "Required parameter '{}' declares no bounds on the values it accepts.",
                            name
                        ),
                    )
                    .for_tool(&tool.name)
                    .with_cwe(cwe)
                    .with_recommendation("Add maxLength/enum/pattern or minimum/maximum bounds."),
                );
            }
        }
    }

    findings
}

/// Credential-looking parameter names are HIGH regardless of declared
/// constraints - a constrained password field is still a password field.
pub fn check_credential_parameters(session: &ScanSession, config: &DetectorConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    for tool in &session.tools {
        for name in tool.params.keys() {
            let name_lower = name.to_lowercase();
            if config
                .credential_params
                .iter()
                .any(|p| name_lower.contains(p))
            {
                findings.push(
                    Finding::new(
                        "credential_exposure",
                        Severity::High,
                        format!(
                            "Credential parameter '{}' in tool '{}'",
                            name, tool.name
                        ),
                        "Passing credentials through tool arguments routes secrets through the \
                         model context, where they can be logged, cached or echoed back.",
                    )
                    .for_tool(&tool.name)
                    .with_cwe("522")
                    .with_recommendation(
                        "Move credentials out of tool arguments into server-side configuration \
                         or a secret store.",
                    ),
                );
            }
        }
    }

    findings
}

fn risky_group(name_lower: &str, config: &DetectorConfig) -> Option<&'static str> {
    if config.injection_params.iter().any(|p| name_lower.contains(p)) {
        return Some("injection-prone");
    }
    if config.path_params.iter().any(|p| name_lower.contains(p)) {
        return Some("path");
    }
    if config.network_params.iter().any(|p| name_lower.contains(p)) {
        return Some("network");
    }
    None
}

fn is_bounded(spec: &ParamSpec) -> bool {
    if spec.ty.is_numeric() {
        spec.constraints.bounds_number()
    } else {
        spec.constraints.bounds_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumerator::{ScanSession, ToolCapability};
    use crate::protocol::Tool;
    use crate::transport::TransportKind;
    use serde_json::json;

    fn session_with_tool(name: &str, schema: serde_json::Value) -> ScanSession {
        let mut session = ScanSession::new("https://t.example/mcp", TransportKind::StreamableHttp);
        session.tools = vec![ToolCapability::from_tool(&Tool {
            name: name.to_string(),
            description: Some("test tool".to_string()),
            input_schema: schema,
        })];
        session
    }

    #[test]
    fn unconstrained_expression_parameter_is_medium() {
        let session = session_with_tool(
            "evaluate_expression",
            json!({
                "type": "object",
                "properties": {"expression": {"type": "string"}},
                "required": ["expression"]
            }),
        );
        let findings = check_parameter_constraints(&session, &DetectorConfig::default());

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
        assert_eq!(findings[0].category, "unbounded_input");
    }

    #[test]
    fn constrained_risky_parameter_is_quiet() {
        let session = session_with_tool(
            "run_query",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string", "maxLength": 100}},
                "required": ["query"]
            }),
        );
        let findings = check_parameter_constraints(&session, &DetectorConfig::default());
        assert!(findings.is_empty());
    }

    #[test]
    fn required_unbounded_string_is_low() {
        let session = session_with_tool(
            "greet",
            json!({
                "type": "object",
                "properties": {"greeting": {"type": "string"}},
                "required": ["greeting"]
            }),
        );
        let findings = check_parameter_constraints(&session, &DetectorConfig::default());

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Low);
    }

    #[test]
    fn optional_unbounded_string_is_quiet() {
        let session = session_with_tool(
            "greet",
            json!({
                "type": "object",
                "properties": {"greeting": {"type": "string"}}
            }),
        );
        let findings = check_parameter_constraints(&session, &DetectorConfig::default());
        assert!(findings.is_empty());
    }

    #[test]
    fn required_unbounded_integer_is_low() {
        let session = session_with_tool(
            "repeat",
            json!({
                "type": "object",
                "properties": {"times": {"type": "integer"}},
                "required": ["times"]
            }),
        );
        let findings = check_parameter_constraints(&session, &DetectorConfig::default());

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Low);
    }

    #[test]
    fn bounded_integer_is_quiet() {
        let session = session_with_tool(
            "repeat",
            json!({
                "type": "object",
                "properties": {"times": {"type": "integer", "minimum": 1, "maximum": 10}},
                "required": ["times"]
            }),
        );
        let findings = check_parameter_constraints(&session, &DetectorConfig::default());
        assert!(findings.is_empty());
    }

    #[test]
    fn credential_parameter_is_high_despite_constraints() {
        let session = session_with_tool(
            "login",
            json!({
                "type": "object",
                "properties": {"password": {"type": "string", "maxLength": 64}}
            }),
        );
        let findings = check_credential_parameters(&session, &DetectorConfig::default());

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].category, "credential_exposure");
    }

    #[test]
    fn one_finding_per_parameter() {
        // "query" is both injection-prone and a required unbounded string;
        // only the MEDIUM rule fires.
        let session = session_with_tool(
            "search",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            }),
        );
        let findings = check_parameter_constraints(&session, &DetectorConfig::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
    }
}
