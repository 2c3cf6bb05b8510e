//! In-memory `Store` with a pluggable `Repository` capability (spec.md §9
//! REDESIGN FLAGS: "explicit `Store` and `AlertLog` values owned by the
//! server struct and passed by reference; no global state").
//!
//! No persistent storage engine (spec.md Non-goals) — grounded on the
//! teacher's `storage::history::HistoryStorage` shape (a typed error enum,
//! an owned handle, CRUD-ish methods) but backed by `DashMap` instead of
//! `sled`, since nothing here needs to survive a restart.

use crate::types::{Alert, AssessmentState, PatientRecord, TriageScore};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("no record found for patient {0}")]
    NotFound(String),
}

/// Capability for persisting per-patient assessment artifacts. A real
/// deployment could back this with a database; the in-memory
/// implementation below is the only one this crate ships.
pub trait Repository: Send + Sync {
    fn put_patient(&self, record: PatientRecord);
    fn get_patient(&self, patient_id: &str) -> Option<PatientRecord>;
    fn put_assessment(&self, assessment: AssessmentState);
    fn get_assessment(&self, patient_id: &str) -> Option<AssessmentState>;
    fn put_triage(&self, patient_id: &str, triage: TriageScore);
    fn get_triage(&self, patient_id: &str) -> Option<TriageScore>;
}

/// The default, non-persistent `Repository`.
#[derive(Default)]
pub struct InMemoryStore {
    patients: DashMap<String, PatientRecord>,
    assessments: DashMap<String, AssessmentState>,
    triage: DashMap<String, TriageScore>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Repository for InMemoryStore {
    fn put_patient(&self, record: PatientRecord) {
        self.patients.insert(record.patient_id.clone(), record);
    }

    fn get_patient(&self, patient_id: &str) -> Option<PatientRecord> {
        self.patients.get(patient_id).map(|r| r.clone())
    }

    fn put_assessment(&self, assessment: AssessmentState) {
        self.assessments.insert(assessment.record.patient_id.clone(), assessment);
    }

    fn get_assessment(&self, patient_id: &str) -> Option<AssessmentState> {
        self.assessments.get(patient_id).map(|a| a.clone())
    }

    fn put_triage(&self, patient_id: &str, triage: TriageScore) {
        self.triage.insert(patient_id.to_string(), triage);
    }

    fn get_triage(&self, patient_id: &str) -> Option<TriageScore> {
        self.triage.get(patient_id).map(|t| t.clone())
    }
}

/// Bounded ring of recently-delivered alerts, owned by the server struct
/// rather than reached for through a singleton (spec.md §9 redesign flag).
pub struct AlertLog {
    entries: Mutex<VecDeque<Alert>>,
    capacity: usize,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self { entries: Mutex::new(VecDeque::with_capacity(capacity)), capacity }
    }

    pub fn record(&self, alert: Alert) {
        let mut entries = self.entries.lock().expect("alert log mutex poisoned");
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(alert);
    }

    pub fn recent(&self, patient_id: &str) -> Vec<Alert> {
        self.entries.lock().expect("alert log mutex poisoned").iter().filter(|a| a.patient_id == patient_id).cloned().collect()
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(1000)
    }
}
