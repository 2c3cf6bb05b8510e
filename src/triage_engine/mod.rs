//! TriageEngine — ESI assignment, priority scoring, and disposition
//! (spec.md §4.5).

use crate::types::{DiagnosisKind, DiagnosisResult, PatientRecord, RiskLevel, TriageScore, VitalName};

/// Chest-pain protocol base workup, bundled the way ESI counts resource
/// *categories* rather than individual tests: biomarkers and BMP are both
/// "labs" and count once. See DESIGN.md Open Question OQ-2 for why resource
/// count is computed once, up front, rather than depending on the ESI level
/// it's meant to determine.
fn predicted_resources(kind: DiagnosisKind, risk: RiskLevel) -> Vec<String> {
    let mut resources = vec!["cardiac biomarkers panel (includes BMP)".to_string()];

    let low_acuity_msk = matches!(
        kind,
        DiagnosisKind::Costochondritis | DiagnosisKind::MuscleStrain | DiagnosisKind::RibFracture
    ) && risk == RiskLevel::Low;
    if !low_acuity_msk {
        resources.push("12-lead ECG".to_string());
    }

    if matches!(kind, DiagnosisKind::Pe | DiagnosisKind::MassivePe) {
        resources.push("CT chest angiogram".to_string());
    }
    if matches!(
        kind,
        DiagnosisKind::Stemi
            | DiagnosisKind::Nstemi
            | DiagnosisKind::UnstableAngina
            | DiagnosisKind::StableAngina
            | DiagnosisKind::Pericarditis
            | DiagnosisKind::Myocarditis
    ) {
        resources.push("troponin trend recheck".to_string());
    }

    resources
}

fn critical_flags(record: &PatientRecord, primary: Option<&DiagnosisResult>) -> Vec<String> {
    let mut flags = Vec::new();
    if primary
        .map(|p| matches!(p.diagnosis_kind, DiagnosisKind::Stemi | DiagnosisKind::MassivePe))
        .unwrap_or(false)
    {
        flags.push("STEMI or Massive PE diagnosis".to_string());
    }
    if record.vital(VitalName::BpSys).map(|v| v < 80.0).unwrap_or(false) {
        flags.push("SBP < 80".to_string());
    }
    if record.vital(VitalName::OxygenSaturation).map(|v| v < 85.0).unwrap_or(false) {
        flags.push("SpO2 < 85".to_string());
    }
    if record
        .vital(VitalName::HeartRate)
        .map(|v| v < 40.0 || v > 150.0)
        .unwrap_or(false)
    {
        flags.push("HR < 40 or > 150".to_string());
    }
    flags
}

fn warning_flags(record: &PatientRecord, primary: Option<&DiagnosisResult>) -> Vec<String> {
    let mut flags = Vec::new();
    if primary.map(|p| p.risk_level == RiskLevel::High).unwrap_or(false) {
        flags.push("primary diagnosis risk HIGH".to_string());
    }
    if record.vital(VitalName::BpSys).map(|v| v < 90.0).unwrap_or(false) {
        flags.push("SBP < 90".to_string());
    }
    if record.vital(VitalName::OxygenSaturation).map(|v| v < 90.0).unwrap_or(false) {
        flags.push("SpO2 < 90".to_string());
    }
    if primary
        .map(|p| matches!(p.diagnosis_kind, DiagnosisKind::Nstemi | DiagnosisKind::UnstableAngina))
        .unwrap_or(false)
    {
        flags.push("NSTEMI or Unstable Angina diagnosis".to_string());
    }
    if record.age > 75 && primary.is_some() {
        flags.push("age > 75".to_string());
    }
    flags
}

/// Score a `PatientRecord` against its (optional) primary diagnosis
/// (spec.md §4.5). A `None` primary is treated as the orchestrator's
/// "Unknown" zero-confidence fallback would be: no ESI1/ESI2 triggers fire.
pub fn triage(record: &PatientRecord, primary: Option<&DiagnosisResult>) -> TriageScore {
    let critical = critical_flags(record, primary);
    let warning = warning_flags(record, primary);

    let kind = primary.map(|p| p.diagnosis_kind).unwrap_or(DiagnosisKind::Unknown);
    let risk = primary.map(|p| p.risk_level).unwrap_or(RiskLevel::Low);
    let resources = predicted_resources(kind, risk);

    let (esi_level, mut priority) = if !critical.is_empty() {
        (1u8, 100.0)
    } else if !warning.is_empty() {
        (2u8, 85.0)
    } else {
        match resources.len() {
            n if n >= 2 => (3u8, 60.0),
            1 => (4u8, 40.0),
            _ => (5u8, 20.0),
        }
    };

    if record.age > 75 {
        priority += 5.0;
    } else if record.age > 65 {
        priority += 2.0;
    }
    priority += 10.0 * critical.len() as f64;
    priority += 5.0 * warning.len() as f64;
    if primary.map(|p| p.confidence > 0.8).unwrap_or(false) {
        priority += 3.0;
    }
    let priority_score = priority.min(100.0);

    let (destination, disposition, nursing_ratio, wait_time_target) = disposition_table(esi_level, kind);

    TriageScore {
        patient_id: record.patient_id.clone(),
        esi_level,
        priority_score,
        wait_time_target: wait_time_target.to_string(),
        destination: destination.to_string(),
        disposition: disposition.to_string(),
        resources_needed: resources,
        nursing_ratio: nursing_ratio.to_string(),
        monitoring_level: monitoring_level(esi_level).to_string(),
        critical_flags: critical,
        warning_flags: warning,
        rationale: format!("ESI {esi_level} assigned from {} for diagnosis {kind}", kind),
    }
}

fn disposition_table(esi_level: u8, kind: DiagnosisKind) -> (&'static str, &'static str, &'static str, &'static str) {
    match esi_level {
        1 => ("Resuscitation bay -> ICU/cath lab", "Admit ICU", "1:1", "0"),
        2 => {
            let disposition = if matches!(kind, DiagnosisKind::Nstemi | DiagnosisKind::UnstableAngina) {
                "Admit telemetry"
            } else {
                "Admit vs Observation"
            };
            ("ED bed with telemetry", disposition, "1:2-3", "<10min")
        }
        3 => ("ED bed", "Observation vs Discharge", "1:4", "10-60min"),
        4 => ("ED chair / fast-track", "Likely discharge", "1:5-6", "1-2h"),
        _ => ("Waiting area -> fast-track", "Discharge", "1:6+", "2-24h"),
    }
}

fn monitoring_level(esi_level: u8) -> &'static str {
    match esi_level {
        1 => "continuous",
        2 => "continuous telemetry",
        3 => "periodic",
        _ => "routine",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LabName, LabPoint, PatientRecordWire, Sex};
    use chrono::Utc;
    use std::collections::{HashMap, HashSet};

    fn diagnosis(kind: DiagnosisKind, risk: RiskLevel, confidence: f64) -> DiagnosisResult {
        DiagnosisResult {
            diagnosis_kind: kind,
            confidence,
            risk_level: risk,
            reasoning: String::new(),
            recommendations: vec![],
            supporting_evidence: Default::default(),
            agent_name: "test".to_string(),
            depth: 0,
            children: vec![],
        }
    }

    fn record(age: u32, vitals: HashMap<VitalName, f64>) -> PatientRecord {
        PatientRecord::try_from(PatientRecordWire {
            patient_id: "P1".to_string(),
            hadm_id: None,
            age,
            sex: Sex::M,
            chief_complaint: String::new(),
            vitals,
            labs: HashMap::new(),
            icd_codes: HashSet::new(),
            admission_time: Utc::now(),
        })
        .unwrap()
    }

    #[test]
    fn stemi_is_esi_1() {
        let r = record(55, HashMap::new());
        let primary = diagnosis(DiagnosisKind::Stemi, RiskLevel::Critical, 0.95);
        let score = triage(&r, Some(&primary));
        assert_eq!(score.esi_level, 1);
        assert_eq!(score.priority_score, 100.0);
    }

    #[test]
    fn nstemi_is_esi_2() {
        let mut v = HashMap::new();
        v.insert(VitalName::BpSys, 145.0);
        let r = record(58, v);
        let primary = diagnosis(DiagnosisKind::Nstemi, RiskLevel::High, 0.85);
        let score = triage(&r, Some(&primary));
        assert_eq!(score.esi_level, 2);
    }

    #[test]
    fn low_acuity_costochondritis_is_esi_4() {
        let mut w = PatientRecordWire {
            patient_id: "P1".to_string(),
            hadm_id: None,
            age: 35,
            sex: Sex::F,
            chief_complaint: String::new(),
            vitals: HashMap::new(),
            labs: HashMap::new(),
            icd_codes: HashSet::new(),
            admission_time: Utc::now(),
        };
        w.labs.insert(LabName::Troponin, vec![LabPoint { timestamp: Utc::now(), value: 0.01 }]);
        let r = PatientRecord::try_from(w).unwrap();
        let primary = diagnosis(DiagnosisKind::Costochondritis, RiskLevel::Low, 0.6);
        let score = triage(&r, Some(&primary));
        assert_eq!(score.esi_level, 4);
    }

    #[test]
    fn priority_capped_at_100() {
        let mut v = HashMap::new();
        v.insert(VitalName::BpSys, 70.0);
        v.insert(VitalName::OxygenSaturation, 80.0);
        let r = record(80, v);
        let primary = diagnosis(DiagnosisKind::Stemi, RiskLevel::Critical, 0.95);
        let score = triage(&r, Some(&primary));
        assert_eq!(score.priority_score, 100.0);
    }
}
