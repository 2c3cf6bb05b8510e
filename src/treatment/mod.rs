//! TreatmentPlanner — static guideline lookup, contraindication flagging,
//! and medication filtering (spec.md §4.6).

use crate::features::FeatureExtractor;
use crate::types::{ClinicalGuideline, Contraindication, DiagnosisKind, DiagnosisResult, LabName, PatientRecord, TreatmentPlan, VitalName};

pub struct TreatmentPlanner;

impl TreatmentPlanner {
    /// Pure lookup-then-tailor (spec.md §4.6): never touches I/O, only a
    /// static guideline table and the patient record.
    pub fn plan(primary: &DiagnosisResult, record: &PatientRecord) -> TreatmentPlan {
        let guideline = guideline_for(primary.diagnosis_kind);
        let flags = contraindications(record);
        let medications = filter_medications(&guideline.first_line_therapies, &flags);

        let mut monitoring_schedule = guideline.monitoring_plan.clone();
        if flags.contains(&Contraindication::RenalImpairment) {
            monitoring_schedule.push("renal function recheck within 12h".to_string());
        }

        TreatmentPlan {
            diagnosis: primary.diagnosis_kind.to_string(),
            immediate_actions: guideline.immediate_actions.clone(),
            medications,
            contraindications_flagged: flags.iter().map(|f| f.to_string()).collect(),
            monitoring_schedule,
            follow_up: follow_up_for(primary.diagnosis_kind),
            patient_education: patient_education_for(primary.diagnosis_kind),
            evidence_grade: guideline.evidence_grade,
            source: guideline.source,
        }
    }
}

fn guideline_for(kind: DiagnosisKind) -> ClinicalGuideline {
    match kind {
        DiagnosisKind::Stemi => ClinicalGuideline {
            immediate_actions: vec!["Activate cath lab".to_string(), "12-lead ECG within 10 minutes".to_string()],
            first_line_therapies: vec![
                "Aspirin 325mg".to_string(),
                "P2Y12 inhibitor (ticagrelor/clopidogrel)".to_string(),
                "Heparin".to_string(),
                "Atorvastatin 80mg".to_string(),
            ],
            alternative_therapies: vec!["Fibrinolysis if PCI unavailable within 120 minutes".to_string()],
            contraindications: vec!["active bleeding".to_string(), "recent major surgery".to_string()],
            monitoring_plan: vec!["continuous telemetry".to_string(), "serial troponins".to_string()],
            evidence_grade: "A".to_string(),
            source: "ACC/AHA STEMI guideline".to_string(),
        },
        DiagnosisKind::Nstemi => ClinicalGuideline {
            immediate_actions: vec!["Serial troponins".to_string(), "Cardiology consult".to_string()],
            first_line_therapies: vec![
                "Aspirin 325mg".to_string(),
                "P2Y12 inhibitor (ticagrelor/clopidogrel)".to_string(),
                "Anticoagulation (heparin/enoxaparin)".to_string(),
                "Beta-blocker".to_string(),
                "Atorvastatin 80mg".to_string(),
            ],
            alternative_therapies: vec!["Early invasive strategy if high-risk features".to_string()],
            contraindications: vec!["active bleeding".to_string()],
            monitoring_plan: vec!["continuous telemetry".to_string(), "serial troponins".to_string()],
            evidence_grade: "A".to_string(),
            source: "ACC/AHA NSTEMI guideline".to_string(),
        },
        DiagnosisKind::UnstableAngina => ClinicalGuideline {
            immediate_actions: vec!["Serial troponins".to_string(), "Cardiology consult".to_string()],
            first_line_therapies: vec![
                "Aspirin 325mg".to_string(),
                "P2Y12 inhibitor (ticagrelor/clopidogrel)".to_string(),
                "Nitrates".to_string(),
                "Beta-blocker".to_string(),
            ],
            alternative_therapies: vec!["Stress testing if troponins remain negative".to_string()],
            contraindications: vec!["hypotension".to_string()],
            monitoring_plan: vec!["telemetry".to_string(), "repeat troponin in 3-6h".to_string()],
            evidence_grade: "B".to_string(),
            source: "ACC/AHA Unstable Angina guideline".to_string(),
        },
        DiagnosisKind::MassivePe => ClinicalGuideline {
            immediate_actions: vec!["Activate massive PE protocol".to_string(), "CT pulmonary angiogram".to_string()],
            first_line_therapies: vec!["Anticoagulation (heparin)".to_string(), "Thrombolysis (alteplase)".to_string()],
            alternative_therapies: vec!["Catheter-directed thrombolysis".to_string(), "Surgical embolectomy".to_string()],
            contraindications: vec!["active bleeding".to_string(), "recent stroke".to_string()],
            monitoring_plan: vec!["continuous hemodynamic monitoring".to_string()],
            evidence_grade: "A".to_string(),
            source: "CHEST PE guideline".to_string(),
        },
        _ => ClinicalGuideline {
            immediate_actions: vec!["Clinical correlation".to_string()],
            first_line_therapies: vec!["Symptomatic management".to_string()],
            alternative_therapies: vec![],
            contraindications: vec![],
            monitoring_plan: vec!["routine vitals".to_string()],
            evidence_grade: "C".to_string(),
            source: "consult specialist".to_string(),
        },
    }
}

/// spec.md §4.6 step 2.
fn contraindications(record: &PatientRecord) -> Vec<Contraindication> {
    let mut flags = Vec::new();
    if record.age > 75 {
        flags.push(Contraindication::AdvancedAge);
    }
    if record.latest_lab(LabName::Creatinine).map(|v| v > 2.0).unwrap_or(false) {
        flags.push(Contraindication::RenalImpairment);
    }
    let features = FeatureExtractor::extract(record);
    if features.platelets.map(|v| v < 50.0).unwrap_or(false) {
        flags.push(Contraindication::SevereThrombocytopenia);
    }
    if record.vital(VitalName::BpSys).map(|v| v < 90.0).unwrap_or(false) {
        flags.push(Contraindication::Hypotension);
    }
    flags
}

fn filter_medications(meds: &[String], flags: &[Contraindication]) -> Vec<String> {
    meds.iter()
        .filter(|m| {
            let lower = m.to_lowercase();
            let antiplatelet_or_anticoagulant =
                lower.contains("aspirin") || lower.contains("p2y12") || lower.contains("heparin") || lower.contains("thrombolysis");
            if flags.contains(&Contraindication::SevereThrombocytopenia) && antiplatelet_or_anticoagulant {
                return false;
            }
            let hypotension_sensitive = lower.contains("nitrate") || lower.contains("beta-blocker");
            if flags.contains(&Contraindication::Hypotension) && hypotension_sensitive {
                return false;
            }
            true
        })
        .cloned()
        .collect()
}

fn follow_up_for(kind: DiagnosisKind) -> Vec<String> {
    match kind {
        DiagnosisKind::Stemi | DiagnosisKind::Nstemi | DiagnosisKind::UnstableAngina => {
            vec!["Cardiology follow-up within 1 week".to_string()]
        }
        DiagnosisKind::MassivePe => vec!["Pulmonology/hematology follow-up within 1 week".to_string(), "Anticoagulation clinic enrollment".to_string()],
        _ => vec!["Primary care follow-up within 3-5 days".to_string()],
    }
}

fn patient_education_for(kind: DiagnosisKind) -> Vec<String> {
    match kind {
        DiagnosisKind::Stemi | DiagnosisKind::Nstemi | DiagnosisKind::UnstableAngina => vec![
            "Return immediately for recurrent chest pain, shortness of breath, or diaphoresis".to_string(),
            "Take all prescribed cardiac medications as directed".to_string(),
        ],
        DiagnosisKind::MassivePe => vec![
            "Return immediately for worsening shortness of breath or leg swelling".to_string(),
            "Anticoagulation bleeding precautions".to_string(),
        ],
        _ => vec!["Return if symptoms worsen or new symptoms develop".to_string()],
    }
}
