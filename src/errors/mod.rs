//! Error taxonomy for the scan pipeline
//!
//! Only two conditions terminate a target's enumeration: the target is
//! unreachable, or it answered but the protocol conversation broke down.
//! Everything else (auth rejection, per-detector failures, unrecognized
//! finding fields) degrades into diagnostic findings and still produces a
//! report.

use miette::Diagnostic;
use thiserror::Error;

use crate::transport::TransportError;

/// Terminal enumeration outcomes
#[derive(Debug, Error, Diagnostic)]
pub enum EnumerateError {
    /// The target never answered: connection refused, DNS failure, timeout
    #[error("target unreachable: {message}")]
    #[diagnostic(
        code(mcprecon::unreachable),
        help("Check the target URL and network path; the scan can be retried as-is")
    )]
    Unreachable { message: String },

    /// Handshake or listing failed after the target answered
    #[error("protocol error over {transport} transport: {message}")]
    #[diagnostic(
        code(mcprecon::protocol),
        help("The target may only support the other transport; retry with --transport")
    )]
    Protocol { transport: String, message: String },
}

impl EnumerateError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        EnumerateError::Unreachable {
            message: message.into(),
        }
    }

    pub fn protocol(transport: impl Into<String>, message: impl Into<String>) -> Self {
        EnumerateError::Protocol {
            transport: transport.into(),
            message: message.into(),
        }
    }

    /// Map a transport failure onto the enumeration taxonomy.
    ///
    /// Auth rejection is NOT part of this mapping - callers must intercept
    /// `TransportError::AuthRejected` first, because it is a successful scan
    /// outcome, not an error.
    pub fn from_transport(transport: &str, err: TransportError) -> Self {
        match err {
            TransportError::Connect(msg) => EnumerateError::unreachable(msg),
            TransportError::Timeout => EnumerateError::unreachable("request timed out"),
            other => EnumerateError::protocol(transport, other.to_string()),
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, EnumerateError::Unreachable { .. })
    }
}

/// Configuration errors raised before a scan starts
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("similarity threshold {value} out of range (0, 1]")]
    #[diagnostic(
        code(mcprecon::config::threshold),
        help("Pass a threshold greater than 0 and at most 1, e.g. --threshold 0.7")
    )]
    InvalidThreshold { value: f64 },

    #[error("unknown merge strategy: '{value}'")]
    #[diagnostic(
        code(mcprecon::config::strategy),
        help("Valid strategies: keep-highest-severity, keep-first, merge-all")
    )]
    UnknownStrategy { value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_failures_map_to_unreachable() {
        let err = EnumerateError::from_transport(
            "sse",
            TransportError::Connect("refused".to_string()),
        );
        assert!(err.is_unreachable());

        let err = EnumerateError::from_transport("sse", TransportError::Timeout);
        assert!(err.is_unreachable());
    }

    #[test]
    fn http_failures_map_to_protocol() {
        let err = EnumerateError::from_transport(
            "streamable-http",
            TransportError::Http {
                status: 500,
                body: "boom".to_string(),
            },
        );
        assert!(!err.is_unreachable());
        assert!(err.to_string().contains("streamable-http"));
    }

    #[test]
    fn malformed_maps_to_protocol() {
        let err = EnumerateError::from_transport(
            "sse",
            TransportError::Malformed("bad json".to_string()),
        );
        assert!(matches!(err, EnumerateError::Protocol { .. }));
    }
}
