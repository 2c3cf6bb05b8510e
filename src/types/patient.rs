//! `PatientRecord` — the immutable snapshot every agent reasons over.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Biological sex as recorded on the chart. Not a judgment about identity —
/// just the closed set the clinical rules in spec.md §4.3 key off of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    M,
    F,
    Other,
}

/// Closed set of vital-sign names a `PatientRecord` may carry (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalName {
    HeartRate,
    BpSys,
    BpDia,
    RespiratoryRate,
    OxygenSaturation,
    Temperature,
}

impl VitalName {
    /// Sanity clamp range `(min, max)`. Values outside this range are
    /// treated as missing (spec.md §3 invariants), never clamped-in-place.
    pub fn sanity_range(self) -> (f64, f64) {
        match self {
            VitalName::HeartRate => (20.0, 250.0),
            VitalName::BpSys => (30.0, 300.0),
            // The spec only states an explicit clamp for systolic BP; we
            // apply the same physiological floor/ceiling shape to diastolic
            // so a malformed diastolic reading can't silently pass through.
            VitalName::BpDia => (10.0, 200.0),
            VitalName::RespiratoryRate => (4.0, 60.0),
            VitalName::OxygenSaturation => (50.0, 100.0),
            VitalName::Temperature => (80.0, 115.0),
        }
    }
}

/// Closed set of lab panel names a `PatientRecord` may carry (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabName {
    Troponin,
    #[serde(rename = "D-dimer")]
    DDimer,
    WBC,
    Lipase,
    Amylase,
    ALT,
    AST,
    Hemoglobin,
    Creatinine,
    BNP,
    #[serde(rename = "CK-MB")]
    CkMb,
    Platelets,
}

/// A single timestamped lab value. Order within a `LabName`'s sequence is
/// chronological and significant for trend analysis (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Wire representation of a patient record, deserialized as-is and then
/// validated/clamped into a [`PatientRecord`] via `TryFrom`. This is the
/// "parse at the boundary" half of the closed-enumeration discipline
/// spec.md §9 calls for: anything that reaches a [`PatientRecord`] has
/// already been range-checked.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientRecordWire {
    pub patient_id: String,
    #[serde(default)]
    pub hadm_id: Option<String>,
    pub age: u32,
    pub sex: Sex,
    #[serde(default)]
    pub chief_complaint: String,
    #[serde(default)]
    pub vitals: HashMap<VitalName, f64>,
    #[serde(default)]
    pub labs: HashMap<LabName, Vec<LabPoint>>,
    #[serde(default)]
    pub icd_codes: HashSet<String>,
    pub admission_time: DateTime<Utc>,
}

/// Immutable per-assessment patient snapshot (spec.md §3).
///
/// Never mutated after construction: every agent receives a `&PatientRecord`
/// and derives features from it without writing back.
#[derive(Debug, Clone, Serialize)]
pub struct PatientRecord {
    pub patient_id: String,
    pub hadm_id: Option<String>,
    pub age: u32,
    pub sex: Sex,
    pub chief_complaint: String,
    pub vitals: HashMap<VitalName, f64>,
    pub labs: HashMap<LabName, Vec<LabPoint>>,
    pub icd_codes: HashSet<String>,
    pub admission_time: DateTime<Utc>,
}

impl TryFrom<PatientRecordWire> for PatientRecord {
    type Error = ValidationError;

    fn try_from(wire: PatientRecordWire) -> Result<Self, Self::Error> {
        if wire.patient_id.trim().is_empty() {
            return Err(ValidationError::EmptyPatientId);
        }

        let vitals = wire
            .vitals
            .into_iter()
            .filter(|(name, value)| {
                let (min, max) = name.sanity_range();
                (min..=max).contains(value)
            })
            .collect();

        // Chronological order matters for trend analysis (spec.md §4.1); the
        // caller's order is trusted but we defensively re-sort per lab so an
        // out-of-order upload can't invert a rising/falling trend read.
        let labs = wire
            .labs
            .into_iter()
            .map(|(name, mut points)| {
                points.sort_by_key(|p| p.timestamp);
                (name, points)
            })
            .collect();

        Ok(PatientRecord {
            patient_id: wire.patient_id,
            hadm_id: wire.hadm_id,
            age: wire.age,
            sex: wire.sex,
            chief_complaint: wire.chief_complaint,
            vitals,
            labs,
            icd_codes: wire.icd_codes,
            admission_time: wire.admission_time,
        })
    }
}

impl PatientRecord {
    /// Latest (most recent by timestamp) value of a lab, if present.
    pub fn latest_lab(&self, name: LabName) -> Option<f64> {
        self.labs.get(&name).and_then(|pts| pts.last()).map(|p| p.value)
    }

    pub fn vital(&self, name: VitalName) -> Option<f64> {
        self.vitals.get(&name).copied()
    }
}
