//! Run state threaded through every probe phase.
//!
//! A run moves strictly forward:
//!
//! ```text
//! Disconnected -> Connected -> FixtureLoaded -> RequestSent -> RecordPersisted -> Verified
//! ```
//!
//! Any non-terminal phase may drop to `Failed`. `Verified` and `Failed` are
//! terminal.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::dispatch::DispatchOutcome;
use crate::error::{FailureKind, ProbeError, ProbeResult};
use crate::fixture::FixtureDocument;
use crate::ids::RunIdentifiers;

/// Phase a run has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunPhase {
    /// Nothing has happened yet.
    Disconnected,
    /// Database and containers are provisioned.
    Connected,
    /// Fixture validated and stamped with fresh identifiers.
    FixtureLoaded,
    /// The order API accepted the POST.
    RequestSent,
    /// The transaction record is written.
    RecordPersisted,
    /// The record was read back.
    Verified,
    /// The run stopped on an error.
    Failed,
}

impl RunPhase {
    /// The phase that follows this one on the success path.
    pub fn next(self) -> Option<RunPhase> {
        match self {
            RunPhase::Disconnected => Some(RunPhase::Connected),
            RunPhase::Connected => Some(RunPhase::FixtureLoaded),
            RunPhase::FixtureLoaded => Some(RunPhase::RequestSent),
            RunPhase::RequestSent => Some(RunPhase::RecordPersisted),
            RunPhase::RecordPersisted => Some(RunPhase::Verified),
            RunPhase::Verified | RunPhase::Failed => None,
        }
    }

    /// Returns true for `Verified` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Verified | RunPhase::Failed)
    }

    /// Lowercase name used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::Disconnected => "disconnected",
            RunPhase::Connected => "connected",
            RunPhase::FixtureLoaded => "fixture-loaded",
            RunPhase::RequestSent => "request-sent",
            RunPhase::RecordPersisted => "record-persisted",
            RunPhase::Verified => "verified",
            RunPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure details carried into the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunFailure {
    /// Phase the run was in when it failed.
    pub phase: RunPhase,
    /// Failure classification.
    pub kind: FailureKind,
    /// Rendered error message.
    pub message: String,
}

/// Mutable state for a single run.
#[derive(Debug)]
pub struct RunContext {
    phase: RunPhase,
    /// Identifiers stamped onto the fixture.
    pub identifiers: Option<RunIdentifiers>,
    /// The fixture after identifier assignment.
    pub fixture: Option<FixtureDocument>,
    /// Status and body returned by the order API.
    pub dispatch: Option<DispatchOutcome>,
    /// Id of the persisted transaction record.
    pub record_id: Option<Uuid>,
    /// Verification queries issued.
    pub attempts: Option<u32>,
    failure: Option<RunFailure>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    /// Creates a context in `Disconnected`.
    pub fn new() -> Self {
        Self {
            phase: RunPhase::Disconnected,
            identifiers: None,
            fixture: None,
            dispatch: None,
            record_id: None,
            attempts: None,
            failure: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Failure details, if the run failed.
    pub fn failure(&self) -> Option<&RunFailure> {
        self.failure.as_ref()
    }

    /// Moves to `to`, which must be the next linear phase.
    pub fn advance(&mut self, to: RunPhase) -> ProbeResult<()> {
        if self.phase.next() != Some(to) {
            return Err(ProbeError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        tracing::debug!(from = %self.phase, to = %to, "run phase advanced");
        self.phase = to;
        Ok(())
    }

    /// Records `error` and moves to `Failed`.
    ///
    /// Failing an already terminal run leaves the first outcome in place.
    pub fn fail(&mut self, error: &ProbeError) {
        if self.phase.is_terminal() {
            tracing::warn!(phase = %self.phase, error = %error, "ignoring failure on finished run");
            return;
        }
        self.failure = Some(RunFailure {
            phase: self.phase,
            kind: error.kind(),
            message: error.to_string(),
        });
        self.phase = RunPhase::Failed;
    }

    /// Summarizes the run.
    pub fn report(&self) -> RunReport {
        RunReport {
            phase: self.phase,
            verified: self.phase == RunPhase::Verified,
            correlation_id: self.identifiers.as_ref().map(|i| i.correlation_id.clone()),
            order_code: self.identifiers.as_ref().map(|i| i.order_code.clone()),
            http_status: self.dispatch.as_ref().map(|d| d.status),
            record_id: self.record_id,
            attempts: self.attempts,
            failure: self.failure.clone(),
        }
    }
}

/// Final summary of a run, printed as JSON by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Phase the run ended in.
    pub phase: RunPhase,
    /// True when the record was read back.
    pub verified: bool,
    /// Generated correlation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Generated order code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_code: Option<String>,
    /// Status returned by the order API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Persisted record id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Uuid>,
    /// Verification queries issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    /// Failure details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<RunFailure>,
}

impl RunReport {
    /// True when the run reached `Verified`.
    pub fn is_success(&self) -> bool {
        self.verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_advance() {
        let mut ctx = RunContext::new();
        for phase in [
            RunPhase::Connected,
            RunPhase::FixtureLoaded,
            RunPhase::RequestSent,
            RunPhase::RecordPersisted,
            RunPhase::Verified,
        ] {
            ctx.advance(phase).unwrap();
            assert_eq!(ctx.phase(), phase);
        }
        assert!(ctx.report().is_success());
    }

    #[test]
    fn test_skipping_a_phase_is_rejected() {
        let mut ctx = RunContext::new();
        let err = ctx.advance(RunPhase::RequestSent).unwrap_err();
        match err {
            ProbeError::InvalidTransition { from, to } => {
                assert_eq!(from, RunPhase::Disconnected);
                assert_eq!(to, RunPhase::RequestSent);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
        assert_eq!(ctx.phase(), RunPhase::Disconnected);
    }

    #[test]
    fn test_advance_cannot_target_failed() {
        let mut ctx = RunContext::new();
        assert!(ctx.advance(RunPhase::Failed).is_err());
    }

    #[test]
    fn test_fail_records_phase_and_kind() {
        let mut ctx = RunContext::new();
        ctx.advance(RunPhase::Connected).unwrap();
        ctx.fail(&ProbeError::VerificationMiss {
            order_code: "X".to_string(),
            attempts: 2,
        });

        assert_eq!(ctx.phase(), RunPhase::Failed);
        let failure = ctx.failure().unwrap();
        assert_eq!(failure.phase, RunPhase::Connected);
        assert_eq!(failure.kind, FailureKind::VerificationMiss);
        assert!(ctx.advance(RunPhase::FixtureLoaded).is_err());
    }

    #[test]
    fn test_fail_after_terminal_keeps_first_outcome() {
        let mut ctx = RunContext::new();
        ctx.fail(&ProbeError::Config(vec!["x".to_string()]));
        ctx.fail(&ProbeError::Config(vec!["y".to_string()]));
        assert_eq!(ctx.failure().unwrap().message, "invalid configuration: x");
    }

    #[test]
    fn test_report_serialization_omits_empty_fields() {
        let json = serde_json::to_value(RunContext::new().report()).unwrap();
        assert_eq!(json["phase"], "disconnected");
        assert_eq!(json["verified"], false);
        assert!(json.get("orderCode").is_none());
        assert!(json.get("failure").is_none());
    }
}
