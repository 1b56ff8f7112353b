//! Security scanner - the heuristic detector bank and scan orchestration

pub mod checks;
mod engine;
pub mod finding;
pub mod keywords;

pub use checks::{run_bank, HEURISTIC_SOURCE};
pub use engine::{merge_findings, ScanConfig, ScanEngine, SourceFindings};
pub use finding::{CapabilityRef, Finding, Severity};
pub use keywords::DetectorConfig;
