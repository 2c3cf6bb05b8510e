//! CardiologyAgent — troponin-table root hypothesis plus a HEART-score ACS
//! sub-agent spawned under high uncertainty (spec.md §4.3.2).

use super::SpecialtyAgent;
use crate::features::{ClinicalFeatures, TroponinTrend};
use crate::types::{DiagnosisKind, DiagnosisResult, PatientRecord, RiskLevel, SpecialtyTag};

pub struct CardiologyAgent;

/// Troponin elevated enough to call ACS possible (spec.md §4.3.2 HEART "troponin" item).
const NORMAL_TROPONIN_CEILING: f64 = 0.05;

impl SpecialtyAgent for CardiologyAgent {
    fn tag(&self) -> SpecialtyTag {
        SpecialtyTag::Cardiology
    }

    fn name(&self) -> &'static str {
        "cardiology"
    }

    fn hypothesize(&self, _record: &PatientRecord, features: &ClinicalFeatures) -> Vec<DiagnosisResult> {
        vec![root_hypothesis(features)]
    }

    /// Cardiology has exactly one concrete subspecialty (spec.md §4.2
    /// supplement / DESIGN.md OQ-1): the ACS/HEART-score sub-agent.
    fn identify_subspecialties(&self, _hypotheses: &[DiagnosisResult]) -> Vec<String> {
        vec!["acs".to_string()]
    }

    fn run_subagent(
        &self,
        tag: &str,
        _record: &PatientRecord,
        features: &ClinicalFeatures,
        depth: u8,
    ) -> Option<DiagnosisResult> {
        if tag != "acs" {
            return None;
        }
        Some(heart_score_subagent(features, depth))
    }
}

fn root_hypothesis(features: &ClinicalFeatures) -> DiagnosisResult {
    let troponin = features.troponin_latest;
    let rising = features.troponin_trend == TroponinTrend::Rising;

    let (kind, risk, confidence) = match troponin {
        Some(t) if t >= 0.5 => (DiagnosisKind::Nstemi, RiskLevel::High, if rising { 0.85 } else { 0.7 }),
        Some(t) if t >= NORMAL_TROPONIN_CEILING => {
            (DiagnosisKind::Nstemi, RiskLevel::High, if rising { 0.7 } else { 0.5 })
        }
        _ => (DiagnosisKind::StableAngina, RiskLevel::Moderate, 0.3),
    };

    DiagnosisResult {
        diagnosis_kind: kind,
        confidence,
        risk_level: risk,
        reasoning: format!(
            "latest troponin {} ({}), trend {:?}",
            troponin.map(|v| v.to_string()).unwrap_or_else(|| "unavailable".to_string()),
            kind,
            features.troponin_trend
        ),
        recommendations: default_recommendations(kind),
        supporting_evidence: Default::default(),
        agent_name: "cardiology".to_string(),
        depth: 0,
        children: Vec::new(),
    }
}

fn default_recommendations(kind: DiagnosisKind) -> Vec<String> {
    match kind {
        DiagnosisKind::Nstemi => vec!["Serial troponins".to_string(), "Cardiology consult".to_string()],
        _ => vec!["Outpatient stress testing if symptoms persist".to_string()],
    }
}

/// HEART score: History(fixed +2), EKG(+0, no signal input), Age, Risk
/// factors (ICD HTN/DM matches), Troponin (spec.md §4.3.2).
fn heart_score(features: &ClinicalFeatures) -> u32 {
    let mut score = 2; // History: fixed +2 for chest-pain presentation
    score += 0; // EKG: no signal input available

    score += if features.age >= 65 {
        2
    } else if features.age >= 45 {
        1
    } else {
        0
    };

    score += match features.cardiac_risk_factor_count {
        n if n >= 3 => 2,
        1 | 2 => 1,
        _ => 0,
    };

    score += match features.troponin_latest {
        Some(t) if t >= 3.0 * NORMAL_TROPONIN_CEILING => 2,
        Some(t) if t >= NORMAL_TROPONIN_CEILING => 1,
        _ => 0,
    };

    score
}

fn heart_score_subagent(features: &ClinicalFeatures, depth: u8) -> DiagnosisResult {
    let score = heart_score(features);
    let troponin_elevated = features
        .troponin_latest
        .map(|t| t >= NORMAL_TROPONIN_CEILING)
        .unwrap_or(false);
    let rising = features.troponin_trend == TroponinTrend::Rising;

    let (kind, confidence, risk) = if troponin_elevated {
        let confidence = if rising { 0.85 } else { 0.7 };
        let risk = if score >= 7 { RiskLevel::High } else { RiskLevel::Moderate };
        (DiagnosisKind::Nstemi, confidence, risk)
    } else {
        // Unstable Angina is part of the ACS umbrella and is triaged as
        // high-risk emergent regardless of HEART score (spec.md §4.5 step 2).
        (DiagnosisKind::UnstableAngina, 0.6, RiskLevel::High)
    };

    DiagnosisResult {
        diagnosis_kind: kind,
        confidence,
        risk_level: risk,
        reasoning: format!("HEART score {score} via ACS sub-agent"),
        recommendations: vec!["Serial troponins".to_string(), "Cardiology consult".to_string()],
        supporting_evidence: Default::default(),
        agent_name: "cardiology.acs".to_string(),
        depth,
        children: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(age: u32, troponin: Option<f64>, trend: TroponinTrend, risk_factors: u32) -> ClinicalFeatures {
        ClinicalFeatures {
            age,
            sex: crate::types::Sex::M,
            tachypnea: false,
            hypoxia: false,
            fever: false,
            tachycardia: false,
            hypotension: false,
            burning: false,
            meal_related: false,
            positional: false,
            relieved_by_antacids: false,
            dysphagia: false,
            epigastric: false,
            nausea: false,
            ruq: false,
            back_radiation: false,
            alcohol_use: false,
            reproducible_with_palpation: false,
            point_tenderness: false,
            sharp: false,
            worse_with_breathing: false,
            worse_with_movement: false,
            recent_exertion_or_trauma: false,
            unilateral: false,
            recent_trauma: false,
            swelling: false,
            leg_swelling: false,
            recent_surgery_or_immobilization: false,
            hemoptysis: false,
            dyspnea: false,
            sudden_onset: false,
            pleuritic: false,
            cough: false,
            nsaid_use: false,
            history_gerd: false,
            history_pud: false,
            history_gallstones: false,
            cardiac_risk_factor_count: risk_factors,
            wbc: None,
            lipase: None,
            amylase: None,
            d_dimer: None,
            troponin_latest: troponin,
            troponin_trend: trend,
            normal_troponin: troponin.map(|t| t < 0.05).unwrap_or(true),
            creatinine: None,
            platelets: None,
        }
    }

    #[test]
    fn heart_score_is_monotone_in_age() {
        let young = heart_score(&features(30, None, TroponinTrend::Unknown, 0));
        let old = heart_score(&features(70, None, TroponinTrend::Unknown, 0));
        assert!(old >= young);
    }

    #[test]
    fn heart_score_is_monotone_in_troponin() {
        let low = heart_score(&features(50, Some(0.01), TroponinTrend::Stable, 0));
        let high = heart_score(&features(50, Some(0.2), TroponinTrend::Stable, 0));
        assert!(high >= low);
    }

    #[test]
    fn high_troponin_root_hypothesis_is_nstemi_high_risk() {
        let f = features(50, Some(0.6), TroponinTrend::Rising, 0);
        let result = root_hypothesis(&f);
        assert_eq!(result.diagnosis_kind, DiagnosisKind::Nstemi);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.confidence, 0.85);
    }

    #[test]
    fn low_troponin_root_hypothesis_is_stable_angina() {
        let f = features(50, Some(0.01), TroponinTrend::Stable, 0);
        let result = root_hypothesis(&f);
        assert_eq!(result.diagnosis_kind, DiagnosisKind::StableAngina);
        assert_eq!(result.risk_level, RiskLevel::Moderate);
    }
}
