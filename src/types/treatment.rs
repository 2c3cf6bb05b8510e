//! `TreatmentPlan` and the static `ClinicalGuideline` it is tailored from
//! (spec.md §4.6).

use serde::Serialize;

/// A static, diagnosis-keyed guideline. Immutable reference data — never
/// constructed at request time, only looked up.
#[derive(Debug, Clone, Serialize)]
pub struct ClinicalGuideline {
    pub immediate_actions: Vec<String>,
    pub first_line_therapies: Vec<String>,
    pub alternative_therapies: Vec<String>,
    pub contraindications: Vec<String>,
    pub monitoring_plan: Vec<String>,
    pub evidence_grade: String,
    pub source: String,
}

/// Contraindication flags derived from the patient record (spec.md §4.6 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Contraindication {
    AdvancedAge,
    RenalImpairment,
    SevereThrombocytopenia,
    Hypotension,
}

impl std::fmt::Display for Contraindication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Contraindication::AdvancedAge => "advanced_age",
            Contraindication::RenalImpairment => "renal_impairment",
            Contraindication::SevereThrombocytopenia => "severe_thrombocytopenia",
            Contraindication::Hypotension => "hypotension",
        };
        write!(f, "{s}")
    }
}

/// Tailored, ready-to-display treatment plan (spec.md §4.6 / §6 JSON shape).
#[derive(Debug, Clone, Serialize)]
pub struct TreatmentPlan {
    pub diagnosis: String,
    pub immediate_actions: Vec<String>,
    pub medications: Vec<String>,
    pub contraindications_flagged: Vec<String>,
    pub monitoring_schedule: Vec<String>,
    pub follow_up: Vec<String>,
    pub patient_education: Vec<String>,
    pub evidence_grade: String,
    pub source: String,
}
