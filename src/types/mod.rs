//! Shared data structures for the chest-pain decision-support pipeline.
//!
//! - `patient`: the immutable `PatientRecord` snapshot and its closed vital/lab enums
//! - `diagnosis`: `DiagnosisResult` and the closed diagnosis/risk/specialty sets
//! - `assessment`: `AssessmentState`, the Orchestrator's output
//! - `triage`: `TriageScore`, the TriageEngine's output
//! - `treatment`: `ClinicalGuideline` / `TreatmentPlan`
//! - `vitals`: streaming-ingestion types (`VitalSample`, `Baseline`, `Alert`)

mod assessment;
mod diagnosis;
mod patient;
mod treatment;
mod triage;
mod vitals;

pub use assessment::*;
pub use diagnosis::*;
pub use patient::*;
pub use treatment::*;
pub use triage::*;
pub use vitals::*;
