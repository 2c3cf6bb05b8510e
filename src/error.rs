//! Typed error taxonomy for the assessment and ingestion pipelines.
//!
//! The core never raises framework exceptions to a caller: every failure
//! becomes one of the variants below, and each pipeline stage knows how to
//! recover from (or surface) its own failures without aborting the request.

use thiserror::Error;

/// Malformed or out-of-range input at a request boundary.
///
/// Recovered by rejecting the request (HTTP 400) in the sync assessment
/// path; in the streaming ingest path the offending field is dropped and
/// processing continues.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("value {value} for field {field} is outside the accepted range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("unknown enum variant {value:?} for field {field}")]
    UnknownVariant { field: &'static str, value: String },

    #[error("patient_id must not be empty")]
    EmptyPatientId,
}

/// A specialty agent crashed, timed out, or produced no hypotheses.
///
/// Recovered locally by the orchestrator: the agent is dropped from
/// `agent_results` and an `AGENT_ERROR:<id>` code is appended to
/// `safety_alerts`. Never propagates to the caller.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("agent {agent} failed: {reason}")]
pub struct AgentError {
    pub agent: String,
    pub reason: String,
}

impl AgentError {
    pub fn new(agent: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            reason: reason.into(),
        }
    }

    /// The `safety_alerts` code this error contributes, per spec.md §4.4/§7.
    pub fn alert_code(&self) -> String {
        format!("AGENT_ERROR:{}", self.agent)
    }
}

/// The LLM backend failed, timed out, or returned an unparseable response.
///
/// Recovered by falling back to a deterministic rule (spec.md §4.8 step 4).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BackendUnavailable {
    #[error("LLM backend timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("LLM backend returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("LLM backend transport error: {0}")]
    Transport(String),
}

/// The alert sink rejected or timed out delivering an alert.
///
/// Surfaced as a metric; never retried inline. The assessment/ingestion
/// that triggered the alert still completes successfully.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("alert delivery failed: {0}")]
pub struct AlertDeliveryFailure(pub String);

/// Top-level outcome type returned by the streaming `/vitals` endpoint.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Backend(#[from] BackendUnavailable),
}
