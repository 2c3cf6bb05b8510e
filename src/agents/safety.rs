//! SafetyAgent — always run, always at depth 0, never recurses (spec.md §4.3.1).

use super::SpecialtyAgent;
use crate::features::{ClinicalFeatures, TroponinTrend};
use crate::types::{DiagnosisKind, DiagnosisResult, PatientRecord, RiskLevel, SpecialtyTag};

pub struct SafetyAgent;

impl SpecialtyAgent for SafetyAgent {
    fn tag(&self) -> SpecialtyTag {
        SpecialtyTag::Safety
    }

    fn name(&self) -> &'static str {
        "safety"
    }

    fn allows_recursion(&self) -> bool {
        false
    }

    fn fallback_risk(&self) -> RiskLevel {
        RiskLevel::Moderate
    }

    fn hypothesize(&self, record: &PatientRecord, features: &ClinicalFeatures) -> Vec<DiagnosisResult> {
        let mut out = Vec::new();

        if let Some(stemi) = stemi_alert(features) {
            out.push(stemi);
        }
        if let Some(pe) = massive_pe_alert(record) {
            out.push(pe);
        }
        if let Some(sepsis) = sepsis_alert(record) {
            out.push(sepsis);
        }

        if out.is_empty() {
            // §4.3.1: a zero-confidence LOW-risk sentinel, not an empty list,
            // so the orchestrator always sees a Safety entry to sort against.
            out.push(
                DiagnosisResult::fallback(self.name(), 0, RiskLevel::Low, "no immediate life-threat indicator found")
                    .clamp_confidence(),
            );
        }

        out
    }
}

fn stemi_alert(features: &ClinicalFeatures) -> Option<DiagnosisResult> {
    let troponin = features.troponin_latest?;
    if troponin >= 0.5 && features.troponin_trend == TroponinTrend::Rising {
        Some(
            DiagnosisResult::fallback("safety", 0, RiskLevel::Critical, "")
                .clamp_confidence()
                .with_stemi(troponin),
        )
    } else {
        None
    }
}

fn massive_pe_alert(record: &PatientRecord) -> Option<DiagnosisResult> {
    use crate::types::VitalName;
    let bp_sys = record.vital(VitalName::BpSys)?;
    let spo2 = record.vital(VitalName::OxygenSaturation)?;
    if bp_sys < 90.0 && spo2 < 90.0 {
        Some(DiagnosisResult {
            diagnosis_kind: DiagnosisKind::MassivePe,
            confidence: 0.85,
            risk_level: RiskLevel::Critical,
            reasoning: format!("hypotension (SBP {bp_sys}) with hypoxia (SpO2 {spo2}) suggests massive PE"),
            recommendations: vec!["Activate massive PE protocol".to_string(), "Consider thrombolysis".to_string()],
            supporting_evidence: Default::default(),
            agent_name: "safety".to_string(),
            depth: 0,
            children: Vec::new(),
        })
    } else {
        None
    }
}

fn sepsis_alert(record: &PatientRecord) -> Option<DiagnosisResult> {
    use crate::types::VitalName;
    let rr = record.vital(VitalName::RespiratoryRate);
    let bp_sys = record.vital(VitalName::BpSys);
    let temp = record.vital(VitalName::Temperature);

    let mut score = 0.0;
    if rr.map(|v| v >= 22.0).unwrap_or(false) {
        score += 1.0;
    }
    if bp_sys.map(|v| v <= 100.0).unwrap_or(false) {
        score += 1.0;
    }
    if temp.map(|v| v >= 101.0 || v <= 96.8).unwrap_or(false) {
        score += 0.5;
    }

    if score >= 2.0 {
        Some(DiagnosisResult {
            diagnosis_kind: DiagnosisKind::Unknown,
            confidence: 0.75,
            risk_level: RiskLevel::Critical,
            reasoning: format!("qSOFA score {score} meets sepsis screening threshold"),
            recommendations: vec!["Initiate sepsis protocol".to_string(), "Blood cultures and lactate".to_string()],
            supporting_evidence: Default::default(),
            agent_name: "safety".to_string(),
            depth: 0,
            children: Vec::new(),
        })
    } else {
        None
    }
}

trait StemiExt {
    fn with_stemi(self, troponin: f64) -> DiagnosisResult;
}

impl StemiExt for DiagnosisResult {
    fn with_stemi(mut self, troponin: f64) -> DiagnosisResult {
        self.diagnosis_kind = DiagnosisKind::Stemi;
        self.confidence = 0.95;
        self.risk_level = RiskLevel::Critical;
        self.reasoning = format!("rising troponin ({troponin} ng/mL, >= 0.5) meets STEMI alert criteria");
        self.recommendations = vec!["Immediate cath lab activation".to_string()];
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureExtractor;
    use crate::types::{PatientRecordWire, Sex, VitalName};
    use chrono::Utc;
    use std::collections::{HashMap, HashSet};

    fn base_wire() -> PatientRecordWire {
        PatientRecordWire {
            patient_id: "P1".to_string(),
            hadm_id: None,
            age: 55,
            sex: Sex::M,
            chief_complaint: "chest pain".to_string(),
            vitals: HashMap::new(),
            labs: HashMap::new(),
            icd_codes: HashSet::new(),
            admission_time: Utc::now(),
        }
    }

    #[test]
    fn massive_pe_requires_both_hypotension_and_hypoxia() {
        let mut w = base_wire();
        w.vitals.insert(VitalName::BpSys, 85.0);
        w.vitals.insert(VitalName::OxygenSaturation, 86.0);
        let record = PatientRecord::try_from(w).unwrap();
        let result = massive_pe_alert(&record).unwrap();
        assert_eq!(result.diagnosis_kind, DiagnosisKind::MassivePe);
        assert_eq!(result.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn sentinel_emitted_when_nothing_fires() {
        let w = base_wire();
        let record = PatientRecord::try_from(w).unwrap();
        let features = FeatureExtractor::extract(&record);
        let agent = SafetyAgent;
        let hyps = agent.hypothesize(&record, &features);
        assert_eq!(hyps.len(), 1);
        assert_eq!(hyps[0].confidence, 0.0);
        assert_eq!(hyps[0].risk_level, RiskLevel::Low);
    }

    #[test]
    fn qsofa_requires_at_least_two_points() {
        let mut w = base_wire();
        w.vitals.insert(VitalName::RespiratoryRate, 24.0);
        let record = PatientRecord::try_from(w).unwrap();
        assert!(sepsis_alert(&record).is_none());
    }
}
