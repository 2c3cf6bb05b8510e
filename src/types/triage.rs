//! `TriageScore` — the TriageEngine's output (spec.md §3/§4.5).

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TriageScore {
    pub patient_id: String,
    pub esi_level: u8,
    pub priority_score: f64,
    pub wait_time_target: String,
    pub destination: String,
    pub disposition: String,
    pub resources_needed: Vec<String>,
    pub nursing_ratio: String,
    pub monitoring_level: String,
    pub critical_flags: Vec<String>,
    pub warning_flags: Vec<String>,
    pub rationale: String,
}
