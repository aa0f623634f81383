//! Error types for the order probe.
//!
//! # Failure kinds
//!
//! | Error | Kind | Raised when |
//! |-------|------|-------------|
//! | `Validation` | validation | fixture has the wrong shape; no network call has been made |
//! | `UnexpectedStatus` | unexpected-status | the order API answered with anything but 201 |
//! | `VerificationMiss` | verification-miss | the record never showed up in the query |
//! | `FixtureIo` / `FixtureParse` | fixture | fixture file unreadable or not JSON |
//! | `Http` | transport | the order API could not be reached |
//! | `Store` | storage | the document store rejected a call |
//! | `Config` | configuration | settings failed validation |

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use shipcheck_store::StoreError;
use thiserror::Error;

use crate::context::RunPhase;

/// Why a fixture document was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The document root is not a JSON object.
    #[error("unexpected JSON structure: document root must be an object")]
    NotAnObject,

    /// A required field is absent.
    #[error("unexpected JSON structure: missing field `{field}`")]
    MissingField {
        /// Dotted path of the field.
        field: &'static str,
    },

    /// A required field has the wrong JSON type.
    #[error("unexpected JSON structure: `{field}` must be {expected}")]
    WrongType {
        /// Dotted path of the field.
        field: &'static str,
        /// Expected JSON type, e.g. "an array".
        expected: &'static str,
    },

    /// An array element that must be an object is not.
    #[error("unexpected JSON structure in {field}: element {index} is not an object")]
    NonObjectElement {
        /// Array field name.
        field: &'static str,
        /// Offending element index.
        index: usize,
    },
}

/// The primary error type for probe operations.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Structural validation failure.
    #[error("structural validation failure: {0}")]
    Validation(#[from] ValidationError),

    /// The fixture file could not be read.
    #[error("failed to read fixture {}: {source}", .path.display())]
    FixtureIo {
        /// Fixture path as configured.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The fixture file is not JSON.
    #[error("fixture {} is not valid JSON: {source}", .path.display())]
    FixtureParse {
        /// Fixture path as configured.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The order API answered with an unexpected status.
    #[error("unexpected response status: expected {expected}, got {actual}")]
    UnexpectedStatus {
        /// Status the probe requires.
        expected: u16,
        /// Status the API returned.
        actual: u16,
        /// Response body text.
        body: String,
    },

    /// The persisted record was not found.
    #[error("order {order_code} not found after {attempts} attempt(s)")]
    VerificationMiss {
        /// Order code that was queried.
        order_code: String,
        /// Number of queries issued.
        attempts: u32,
    },

    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Document store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid configuration.
    #[error("invalid configuration: {}", .0.join("; "))]
    Config(Vec<String>),

    /// Serialization of a request body or record failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The run tried to skip or repeat a phase.
    #[error("invalid run transition from {from} to {to}")]
    InvalidTransition {
        /// Phase the run was in.
        from: RunPhase,
        /// Phase that was requested.
        to: RunPhase,
    },
}

/// Coarse classification of a [`ProbeError`], used in run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// Malformed fixture.
    Validation,
    /// Order API returned something other than 201.
    UnexpectedStatus,
    /// Record not found by the verification query.
    VerificationMiss,
    /// Fixture file unreadable or unparseable.
    Fixture,
    /// Order API unreachable.
    Transport,
    /// Document store failure.
    Storage,
    /// Invalid settings.
    Configuration,
    /// Programming error.
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Validation => "validation",
            FailureKind::UnexpectedStatus => "unexpected-status",
            FailureKind::VerificationMiss => "verification-miss",
            FailureKind::Fixture => "fixture",
            FailureKind::Transport => "transport",
            FailureKind::Storage => "storage",
            FailureKind::Configuration => "configuration",
            FailureKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl ProbeError {
    /// Classifies the error.
    pub fn kind(&self) -> FailureKind {
        match self {
            ProbeError::Validation(_) => FailureKind::Validation,
            ProbeError::FixtureIo { .. } | ProbeError::FixtureParse { .. } => FailureKind::Fixture,
            ProbeError::UnexpectedStatus { .. } => FailureKind::UnexpectedStatus,
            ProbeError::VerificationMiss { .. } => FailureKind::VerificationMiss,
            ProbeError::Http(_) => FailureKind::Transport,
            ProbeError::Store(_) => FailureKind::Storage,
            ProbeError::Config(_) => FailureKind::Configuration,
            ProbeError::Serialization(_) | ProbeError::InvalidTransition { .. } => {
                FailureKind::Internal
            }
        }
    }
}

/// Result type for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_kind() {
        let err: ProbeError = ValidationError::MissingField { field: "routes" }.into();
        assert_eq!(err.kind(), FailureKind::Validation);
        assert_eq!(
            err.to_string(),
            "structural validation failure: unexpected JSON structure: missing field `routes`"
        );
    }

    #[test]
    fn test_unexpected_status_display() {
        let err = ProbeError::UnexpectedStatus {
            expected: 201,
            actual: 400,
            body: "bad order".to_string(),
        };
        assert_eq!(err.kind(), FailureKind::UnexpectedStatus);
        assert_eq!(
            err.to_string(),
            "unexpected response status: expected 201, got 400"
        );
    }

    #[test]
    fn test_config_error_joins_messages() {
        let err = ProbeError::Config(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "invalid configuration: a; b");
        assert_eq!(err.kind(), FailureKind::Configuration);
    }

    #[test]
    fn test_failure_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&FailureKind::VerificationMiss).unwrap();
        assert_eq!(json, "\"verification-miss\"");
    }
}
