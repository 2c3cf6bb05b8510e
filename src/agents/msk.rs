//! MskAgent — Costochondritis, Muscle strain, Rib fracture (spec.md §4.3.4).

use super::{EMISSION_FLOOR, SpecialtyAgent};
use crate::features::ClinicalFeatures;
use crate::types::{DiagnosisKind, DiagnosisResult, PatientRecord, RiskLevel, SpecialtyTag};

pub struct MskAgent;

impl SpecialtyAgent for MskAgent {
    fn tag(&self) -> SpecialtyTag {
        SpecialtyTag::Musculoskeletal
    }

    fn name(&self) -> &'static str {
        "msk"
    }

    fn hypothesize(&self, _record: &PatientRecord, features: &ClinicalFeatures) -> Vec<DiagnosisResult> {
        [costochondritis(features), muscle_strain(features), rib_fracture(features)]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Risk rule spec.md §4.3.4 states explicitly for Rib fracture only;
/// Costochondritis and Muscle strain carry no stratification rule of their
/// own and stay LOW regardless of score (chest-wall pain is low-acuity by
/// default — see DESIGN.md OQ-3).
fn risk_from_score(score: f64) -> RiskLevel {
    if score > 0.7 {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

fn costochondritis(f: &ClinicalFeatures) -> Option<DiagnosisResult> {
    let mut score = 0.0;
    if f.reproducible_with_palpation {
        score += 0.40;
    }
    if f.point_tenderness {
        score += 0.25;
    }
    if f.sharp {
        score += 0.15;
    }
    if f.worse_with_breathing {
        score += 0.15;
    }
    if f.worse_with_movement {
        score += 0.10;
    }
    if (20..=40).contains(&f.age) {
        score += 0.20;
    } else if (41..=60).contains(&f.age) {
        score += 0.10;
    }
    if f.normal_troponin {
        score += 0.15;
    }
    let score = score.min(1.0);
    if score <= EMISSION_FLOOR {
        return None;
    }

    Some(DiagnosisResult {
        diagnosis_kind: DiagnosisKind::Costochondritis,
        confidence: score,
        risk_level: RiskLevel::Low,
        reasoning: format!("costochondritis score {score:.2}"),
        recommendations: vec!["NSAIDs and reassurance".to_string()],
        supporting_evidence: Default::default(),
        agent_name: "msk".to_string(),
        depth: 0,
        children: Vec::new(),
    })
}

fn muscle_strain(f: &ClinicalFeatures) -> Option<DiagnosisResult> {
    let mut score = 0.0;
    if f.recent_exertion_or_trauma {
        score += 0.35;
    }
    if f.worse_with_movement {
        score += 0.30;
    }
    if f.reproducible_with_palpation {
        score += 0.20;
    }
    if f.unilateral {
        score += 0.15;
    }
    if f.sharp {
        score += 0.10;
    }
    if f.age < 40 {
        score += 0.15;
    }
    if f.normal_troponin {
        score += 0.10;
    }
    let score = score.min(1.0);
    if score <= EMISSION_FLOOR {
        return None;
    }

    Some(DiagnosisResult {
        diagnosis_kind: DiagnosisKind::MuscleStrain,
        confidence: score,
        risk_level: RiskLevel::Low,
        reasoning: format!("muscle strain score {score:.2}"),
        recommendations: vec!["Rest, NSAIDs, activity modification".to_string()],
        supporting_evidence: Default::default(),
        agent_name: "msk".to_string(),
        depth: 0,
        children: Vec::new(),
    })
}

fn rib_fracture(f: &ClinicalFeatures) -> Option<DiagnosisResult> {
    let mut score = 0.0;
    if f.recent_trauma {
        score += 0.50;
    }
    if f.worse_with_breathing {
        score += 0.25;
    }
    if f.point_tenderness {
        score += 0.20;
    }
    if f.sharp {
        score += 0.15;
    }
    if f.age >= 65 {
        score += 0.20;
    }
    if f.swelling {
        score += 0.15;
    }
    let score = score.min(1.0);
    if score <= EMISSION_FLOOR {
        return None;
    }

    Some(DiagnosisResult {
        diagnosis_kind: DiagnosisKind::RibFracture,
        confidence: score,
        risk_level: risk_from_score(score),
        reasoning: format!("rib fracture score {score:.2}"),
        recommendations: vec!["Chest X-ray, incentive spirometry, pain control".to_string()],
        supporting_evidence: Default::default(),
        agent_name: "msk".to_string(),
        depth: 0,
        children: Vec::new(),
    })
}
