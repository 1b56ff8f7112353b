//! The heuristic detector bank
//!
//! A fixed, ordered registry of independent, pure evaluators. Each detector
//! is a plain function from a finalized session snapshot to zero or more
//! findings; detectors share no mutable state and have no side effects. A
//! detector that panics is converted into a low-severity diagnostic and the
//! bank continues - one bad rule never takes down a scan.

mod capability;
mod docs;
mod params;
mod poisoning;
mod resources;
mod transport;

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::enumerator::ScanSession;

use super::finding::{Finding, Severity};
use super::keywords::DetectorConfig;

pub use capability::{
    check_dangerous_capabilities, check_excessive_permissions, check_tool_shadowing,
};
pub use docs::check_documentation;
pub use params::{check_credential_parameters, check_parameter_constraints};
pub use poisoning::check_tool_poisoning;
pub use resources::check_resource_exposure;
pub use transport::{check_authentication, check_transport_security};

type DetectorFn = fn(&ScanSession, &DetectorConfig) -> Vec<Finding>;

/// A registered detector
pub struct Detector {
    pub name: &'static str,
    run: DetectorFn,
}

/// The bank, in evaluation order. Output order is detector order then
/// capability order; it carries no priority meaning.
pub const DETECTOR_BANK: &[Detector] = &[
    Detector {
        name: "transport_security",
        run: check_transport_security,
    },
    Detector {
        name: "authentication",
        run: check_authentication,
    },
    Detector {
        name: "dangerous_capabilities",
        run: check_dangerous_capabilities,
    },
    Detector {
        name: "excessive_permissions",
        run: check_excessive_permissions,
    },
    Detector {
        name: "parameter_constraints",
        run: check_parameter_constraints,
    },
    Detector {
        name: "credential_parameters",
        run: check_credential_parameters,
    },
    Detector {
        name: "tool_poisoning",
        run: check_tool_poisoning,
    },
    Detector {
        name: "tool_shadowing",
        run: check_tool_shadowing,
    },
    Detector {
        name: "resource_exposure",
        run: check_resource_exposure,
    },
    Detector {
        name: "documentation",
        run: check_documentation,
    },
];

/// Source tag attached to every finding the bank produces
pub const HEURISTIC_SOURCE: &str = "heuristic";

/// Run every detector over the session, isolating per-detector failures.
pub fn run_bank(session: &ScanSession, config: &DetectorConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    for detector in DETECTOR_BANK {
        match catch_unwind(AssertUnwindSafe(|| (detector.run)(session, config))) {
            Ok(batch) => {
                findings.extend(
                    batch
                        .into_iter()
                        .map(|f| f.with_source(HEURISTIC_SOURCE)),
                );
            }
            Err(_) => {
                tracing::warn!("detector '{}' panicked, continuing", detector.name);
                if !config.quiet {
                    findings.push(
                        Finding::new(
                            "detector_error",
                            Severity::Low,
                            format!("Detector '{}' failed", detector.name),
                            "The detector raised an internal error and its checks were \
                             skipped for this session; remaining detectors ran normally.",
                        )
                        .with_recommendation("Re-run the scan; report if the failure persists.")
                        .with_source(HEURISTIC_SOURCE),
                    );
                }
            }
        }
    }

    findings
}
