//! `AssessmentState` — the Orchestrator's output.

use super::diagnosis::DiagnosisResult;
use super::patient::PatientRecord;
use serde::Serialize;

/// Produced by the Orchestrator (spec.md §3/§4.4).
///
/// `agent_results` is owned here; `primary` is an index into it, never an
/// independent copy, so that the "life-threat never loses" invariant (P1)
/// is checkable by identity, not by re-deriving confidence. `record` is the
/// full input snapshot that produced this assessment (spec.md §3), not just
/// its id, so a caller holding only an `AssessmentState` can still recover
/// the patient data behind it.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentState {
    pub record: PatientRecord,
    pub agent_results: Vec<DiagnosisResult>,
    /// Index into `agent_results` of the chosen primary diagnosis.
    primary_index: usize,
    pub safety_alerts: Vec<String>,
}

impl AssessmentState {
    pub fn new(
        record: &PatientRecord,
        agent_results: Vec<DiagnosisResult>,
        primary_index: usize,
        safety_alerts: Vec<String>,
    ) -> Self {
        debug_assert!(
            primary_index < agent_results.len(),
            "primary must reference an entry already present in agent_results"
        );
        Self {
            record: record.clone(),
            agent_results,
            primary_index,
            safety_alerts,
        }
    }

    /// The chosen primary diagnosis — a reference into `agent_results`,
    /// never a copy (spec.md §3 Ownership).
    pub fn primary(&self) -> &DiagnosisResult {
        &self.agent_results[self.primary_index]
    }

    pub fn confidence(&self) -> f64 {
        self.primary().confidence
    }
}
