//! GastroAgent — additive score tables for GERD, esophageal spasm, PUD,
//! biliary colic, and pancreatitis (spec.md §4.3.3).

use super::{EMISSION_FLOOR, SpecialtyAgent};
use crate::features::ClinicalFeatures;
use crate::types::{DiagnosisKind, DiagnosisResult, PatientRecord, RiskLevel, Sex, SpecialtyTag};

pub struct GastroAgent;

impl SpecialtyAgent for GastroAgent {
    fn tag(&self) -> SpecialtyTag {
        SpecialtyTag::Gastroenterology
    }

    fn name(&self) -> &'static str {
        "gastro"
    }

    fn hypothesize(&self, _record: &PatientRecord, features: &ClinicalFeatures) -> Vec<DiagnosisResult> {
        [gerd(features), spasm(features), pud(features), biliary(features), pancreatitis(features)]
            .into_iter()
            .flatten()
            .collect()
    }
}

fn gerd(f: &ClinicalFeatures) -> Option<DiagnosisResult> {
    let mut score = 0.0;
    if f.burning {
        score += 0.25;
    }
    if f.meal_related {
        score += 0.20;
    }
    if f.positional {
        score += 0.20;
    }
    if f.relieved_by_antacids {
        score += 0.25;
    }
    if f.history_gerd {
        score += 0.30;
    }
    if (40..=70).contains(&f.age) {
        score += 0.10;
    }
    let score = score.min(1.0);
    if score <= EMISSION_FLOOR {
        return None;
    }

    let alarm = f.dysphagia || f.age > 60;
    let mut recommendations = vec!["Trial of PPI therapy".to_string()];
    if alarm {
        recommendations.insert(0, "Urgent EGD recommended".to_string());
    }

    Some(DiagnosisResult {
        diagnosis_kind: DiagnosisKind::Gerd,
        confidence: score,
        risk_level: if alarm { RiskLevel::Moderate } else { RiskLevel::Low },
        reasoning: format!("GERD score {score:.2}{}", if alarm { " with alarm features" } else { "" }),
        recommendations,
        supporting_evidence: Default::default(),
        agent_name: "gastro".to_string(),
        depth: 0,
        children: Vec::new(),
    })
}

fn spasm(f: &ClinicalFeatures) -> Option<DiagnosisResult> {
    let mut score = 0.0;
    if f.dysphagia {
        score += 0.35;
    }
    if f.burning {
        score += 0.15;
    }
    if f.normal_troponin {
        score += 0.20;
    }
    let score = score.min(0.7);
    if score <= EMISSION_FLOOR {
        return None;
    }

    Some(DiagnosisResult {
        diagnosis_kind: DiagnosisKind::EsophagealSpasm,
        confidence: score,
        // Not specified in spec.md's §4.3.3 table; esophageal spasm is a
        // benign functional diagnosis, so it defaults to the same LOW
        // baseline GERD uses absent alarm features.
        risk_level: RiskLevel::Low,
        reasoning: format!("esophageal spasm score {score:.2}"),
        recommendations: vec!["Consider calcium channel blocker trial".to_string()],
        supporting_evidence: Default::default(),
        agent_name: "gastro".to_string(),
        depth: 0,
        children: Vec::new(),
    })
}

fn pud(f: &ClinicalFeatures) -> Option<DiagnosisResult> {
    let mut score = 0.0;
    if f.epigastric {
        score += 0.30;
    }
    if f.burning {
        score += 0.20;
    }
    if f.history_pud {
        score += 0.35;
    }
    if f.nsaid_use {
        score += 0.25;
    }
    if f.nausea {
        score += 0.15;
    }
    let score = score.min(1.0);
    if score <= EMISSION_FLOOR {
        return None;
    }

    Some(DiagnosisResult {
        diagnosis_kind: DiagnosisKind::Pud,
        confidence: score,
        risk_level: RiskLevel::Low,
        reasoning: format!("peptic ulcer disease score {score:.2}"),
        recommendations: vec!["PPI therapy and H. pylori testing".to_string()],
        supporting_evidence: Default::default(),
        agent_name: "gastro".to_string(),
        depth: 0,
        children: Vec::new(),
    })
}

fn biliary(f: &ClinicalFeatures) -> Option<DiagnosisResult> {
    let mut score = 0.0;
    if f.ruq {
        score += 0.35;
    }
    if f.sex == Sex::F {
        score += 0.15;
    }
    if f.age >= 40 {
        score += 0.10;
    }
    if f.meal_related {
        score += 0.25;
    }
    if f.back_radiation {
        score += 0.20;
    }
    if f.history_gallstones {
        score += 0.40;
    }
    if f.wbc.map(|v| v > 11.0).unwrap_or(false) {
        score += 0.15;
    }
    let score = score.min(1.0);
    if score <= EMISSION_FLOOR {
        return None;
    }

    Some(DiagnosisResult {
        diagnosis_kind: DiagnosisKind::BiliaryColic,
        confidence: score,
        risk_level: RiskLevel::Low,
        reasoning: format!("biliary colic score {score:.2}"),
        recommendations: vec!["RUQ ultrasound".to_string()],
        supporting_evidence: Default::default(),
        agent_name: "gastro".to_string(),
        depth: 0,
        children: Vec::new(),
    })
}

fn pancreatitis(f: &ClinicalFeatures) -> Option<DiagnosisResult> {
    let mut score = 0.0;
    let mut criteria_met = 0;

    if f.epigastric && f.back_radiation {
        score += 0.35;
        criteria_met += 1;
    }
    if f.lipase.map(|v| v > 180.0).unwrap_or(false) {
        score += 0.50;
        criteria_met += 1;
    } else if f.amylase.map(|v| v > 300.0).unwrap_or(false) {
        score += 0.45;
        criteria_met += 1;
    }

    if criteria_met == 0 {
        return None;
    }

    if f.alcohol_use {
        score += 0.20;
    }
    if f.history_gallstones {
        score += 0.25;
    }
    let score = score.min(1.0);
    if score <= EMISSION_FLOOR {
        return None;
    }

    Some(DiagnosisResult {
        diagnosis_kind: DiagnosisKind::Pancreatitis,
        confidence: score,
        risk_level: if score >= 0.7 { RiskLevel::High } else { RiskLevel::Moderate },
        reasoning: format!("pancreatitis score {score:.2} ({criteria_met} core criteria met)"),
        recommendations: vec!["Lipase/amylase trend, IV fluids, NPO".to_string()],
        supporting_evidence: Default::default(),
        agent_name: "gastro".to_string(),
        depth: 0,
        children: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_features() -> ClinicalFeatures {
        ClinicalFeatures {
            age: 45,
            sex: Sex::F,
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
            cardiac_risk_factor_count: 0,
            wbc: None,
            lipase: None,
            amylase: None,
            d_dimer: None,
            troponin_latest: None,
            troponin_trend: crate::features::TroponinTrend::Unknown,
            normal_troponin: true,
            creatinine: None,
            platelets: None,
        }
    }

    #[test]
    fn gerd_below_floor_is_not_emitted() {
        let f = base_features();
        assert!(gerd(&f).is_none());
    }

    #[test]
    fn gerd_with_alarm_features_is_moderate_and_flags_egd() {
        let mut f = base_features();
        f.burning = true;
        f.meal_related = true;
        f.relieved_by_antacids = true;
        f.history_gerd = true;
        f.dysphagia = true;
        let result = gerd(&f).unwrap();
        assert_eq!(result.risk_level, RiskLevel::Moderate);
        assert_eq!(result.recommendations[0], "Urgent EGD recommended");
    }

    #[test]
    fn pancreatitis_requires_at_least_one_core_criterion() {
        let mut f = base_features();
        f.alcohol_use = true;
        f.history_gallstones = true;
        assert!(pancreatitis(&f).is_none());
    }

    #[test]
    fn pancreatitis_high_risk_above_0_7() {
        let mut f = base_features();
        f.epigastric = true;
        f.back_radiation = true;
        f.lipase = Some(300.0);
        f.alcohol_use = true;
        let result = pancreatitis(&f).unwrap();
        assert_eq!(result.risk_level, RiskLevel::High);
    }

    #[test]
    fn spasm_score_is_capped_at_0_7() {
        let mut f = base_features();
        f.dysphagia = true;
        f.burning = true;
        f.normal_troponin = true;
        let result = spasm(&f).unwrap();
        assert_eq!(result.confidence, 0.7);
    }
}
