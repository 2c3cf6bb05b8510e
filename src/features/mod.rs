//! `FeatureExtractor` — derives the fixed clinical feature set every
//! specialty scorer consumes from a `PatientRecord` (spec.md §4.1).
//!
//! A single [`ClinicalFeatures`] struct is materialized once per assessment
//! and shared (by reference) across every specialty agent, the way the
//! teacher's `physics_engine::metrics` derives one `DrillingPhysicsReport`
//! consumed by every specialist vote.

use crate::types::{DiagnosisKind, LabName, PatientRecord, Sex, VitalName};
use regex::Regex;
use std::sync::OnceLock;

/// Troponin trend classification (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TroponinTrend {
    Rising,
    Falling,
    Stable,
    /// Fewer than two points exist — no trend can be computed.
    Unknown,
}

/// The full set of derived clinical features consumed by the scorers in
/// spec.md §4.3. Booleans are keyword/lookup derived; numbers are the
/// latest lab/vital values a scorer needs directly.
#[derive(Debug, Clone)]
pub struct ClinicalFeatures {
    pub age: u32,
    pub sex: Sex,

    // Vital-derived flags
    pub tachypnea: bool,
    pub hypoxia: bool,
    pub fever: bool,
    pub tachycardia: bool,
    pub hypotension: bool,

    // Chief-complaint keyword flags
    pub burning: bool,
    pub meal_related: bool,
    pub positional: bool,
    pub relieved_by_antacids: bool,
    pub dysphagia: bool,
    pub epigastric: bool,
    pub nausea: bool,
    pub ruq: bool,
    pub back_radiation: bool,
    pub alcohol_use: bool,
    pub reproducible_with_palpation: bool,
    pub point_tenderness: bool,
    pub sharp: bool,
    pub worse_with_breathing: bool,
    pub worse_with_movement: bool,
    pub recent_exertion_or_trauma: bool,
    pub unilateral: bool,
    pub recent_trauma: bool,
    pub swelling: bool,
    pub leg_swelling: bool,
    pub recent_surgery_or_immobilization: bool,
    pub hemoptysis: bool,
    pub dyspnea: bool,
    pub sudden_onset: bool,
    pub pleuritic: bool,
    pub cough: bool,
    pub nsaid_use: bool,

    // ICD-derived history flags
    pub history_gerd: bool,
    pub history_pud: bool,
    pub history_gallstones: bool,
    /// Count of ICD matches against hypertension/diabetes codes, used by
    /// the HEART score's "risk factors" component (spec.md §4.3.2).
    pub cardiac_risk_factor_count: u32,

    // Labs (latest value unless noted)
    pub wbc: Option<f64>,
    pub lipase: Option<f64>,
    pub amylase: Option<f64>,
    pub d_dimer: Option<f64>,
    pub troponin_latest: Option<f64>,
    pub troponin_trend: TroponinTrend,
    pub normal_troponin: bool,
    pub creatinine: Option<f64>,
    pub platelets: Option<f64>,
}

/// ICD lookup table entries (spec.md §4.3.3 + HEART score risk factors).
/// Codes are matched after stripping non-alphanumeric characters, so
/// "530.1" and "5301" both match.
const ICD_GERD: &[&str] = &["5301"];
const ICD_ULCER: &[&str] = &["5310", "5311"];
const ICD_CHOLELITHIASIS: &[&str] = &["5750", "5751"];
const ICD_PANCREATITIS: &[&str] = &["5770"];
// Hypertension / diabetes mellitus, the two conditions spec.md §4.3.2
// names as the HEART score's "risk factors" count. ICD-9-CM prefixes.
const ICD_HTN_PREFIX: &str = "401";
const ICD_DM_PREFIX: &str = "250";

fn normalize_icd(code: &str) -> String {
    code.chars().filter(|c| c.is_alphanumeric()).collect()
}

fn icd_matches_any(codes: &std::collections::HashSet<String>, table: &[&str]) -> bool {
    codes.iter().any(|c| {
        let n = normalize_icd(c);
        table.contains(&n.as_str())
    })
}

fn cardiac_risk_factor_count(codes: &std::collections::HashSet<String>) -> u32 {
    codes
        .iter()
        .filter(|c| {
            let n = normalize_icd(c);
            n.starts_with(ICD_HTN_PREFIX) || n.starts_with(ICD_DM_PREFIX)
        })
        .count() as u32
}

/// Lazily-compiled keyword patterns, one per feature, matched
/// case-insensitively against the free-text chief complaint.
struct KeywordPatterns {
    burning: Regex,
    meal_related: Regex,
    positional: Regex,
    antacids: Regex,
    dysphagia: Regex,
    epigastric: Regex,
    nausea: Regex,
    ruq: Regex,
    back_radiation: Regex,
    alcohol: Regex,
    reproducible: Regex,
    point_tenderness: Regex,
    sharp: Regex,
    worse_breathing: Regex,
    worse_movement: Regex,
    exertion_trauma: Regex,
    unilateral: Regex,
    trauma: Regex,
    swelling: Regex,
    leg_swelling: Regex,
    surgery_immobilization: Regex,
    hemoptysis: Regex,
    dyspnea: Regex,
    sudden_onset: Regex,
    pleuritic: Regex,
    cough: Regex,
    nsaid: Regex,
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("feature keyword pattern is a fixed, tested literal")
}

fn patterns() -> &'static KeywordPatterns {
    static PATTERNS: OnceLock<KeywordPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| KeywordPatterns {
        burning: re(r"(?i)burn"),
        meal_related: re(r"(?i)(after (eating|meal)|meal|food)"),
        positional: re(r"(?i)(lying down|positional|bending|reclin)"),
        antacids: re(r"(?i)antacid"),
        dysphagia: re(r"(?i)(dysphagia|trouble swallowing|difficulty swallowing)"),
        epigastric: re(r"(?i)epigastric"),
        nausea: re(r"(?i)(nausea|vomit)"),
        ruq: re(r"(?i)(ruq|right upper quadrant)"),
        back_radiation: re(r"(?i)(radiat\w* to (the )?back|back pain)"),
        alcohol: re(r"(?i)(alcohol|etoh)"),
        reproducible: re(r"(?i)(reproducible|touch|palpat)"),
        point_tenderness: re(r"(?i)(point tender|tender to touch)"),
        sharp: re(r"(?i)sharp"),
        worse_breathing: re(r"(?i)(breath|inspiration)"),
        worse_movement: re(r"(?i)(movement|moving|turning)"),
        exertion_trauma: re(r"(?i)(exertion|lifting|strain|trauma|fall|injury)"),
        unilateral: re(r"(?i)(one side|unilateral|left side|right side)"),
        trauma: re(r"(?i)(trauma|fall|hit|injury|accident)"),
        swelling: re(r"(?i)swell"),
        leg_swelling: re(r"(?i)(leg swelling|calf swelling|swollen leg)"),
        surgery_immobilization: re(r"(?i)(recent surgery|immobil|long flight|bed rest)"),
        hemoptysis: re(r"(?i)(hemoptysis|coughing blood|blood.?tinged sputum)"),
        dyspnea: re(r"(?i)(dyspnea|shortness of breath|short of breath|sob\b)"),
        sudden_onset: re(r"(?i)(sudden|abrupt|acute onset)"),
        pleuritic: re(r"(?i)(pleuritic|worse with deep breath|worse with breathing)"),
        cough: re(r"(?i)cough"),
        nsaid: re(r"(?i)(nsaid|ibuprofen|naproxen|aspirin use)"),
    })
}

/// Derives the fixed clinical feature set for an assessment. Pure function:
/// no I/O, deterministic for identical input (spec.md P6).
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn extract(record: &PatientRecord) -> ClinicalFeatures {
        let p = patterns();
        let text = record.chief_complaint.as_str();
        let m = |re: &Regex| re.is_match(text);

        let rr = record.vital(VitalName::RespiratoryRate);
        let spo2 = record.vital(VitalName::OxygenSaturation);
        let temp = record.vital(VitalName::Temperature);
        let hr = record.vital(VitalName::HeartRate);
        let bp_sys = record.vital(VitalName::BpSys);

        let troponin_points = record.labs.get(&LabName::Troponin);
        let troponin_latest = troponin_points.and_then(|pts| pts.last()).map(|p| p.value);
        let troponin_trend = troponin_points
            .map(|pts| classify_troponin_trend(pts.iter().map(|p| p.value).collect::<Vec<_>>().as_slice()))
            .unwrap_or(TroponinTrend::Unknown);
        let normal_troponin = troponin_latest.map(|v| v < 0.05).unwrap_or(true);

        ClinicalFeatures {
            age: record.age,
            sex: record.sex,

            tachypnea: rr.map(|v| v > 20.0).unwrap_or(false),
            hypoxia: spo2.map(|v| v < 94.0).unwrap_or(false),
            fever: temp.map(|v| v > 100.4).unwrap_or(false),
            tachycardia: hr.map(|v| v > 100.0).unwrap_or(false),
            hypotension: bp_sys.map(|v| v < 90.0).unwrap_or(false),

            burning: m(&p.burning),
            meal_related: m(&p.meal_related),
            positional: m(&p.positional),
            relieved_by_antacids: m(&p.antacids),
            dysphagia: m(&p.dysphagia),
            epigastric: m(&p.epigastric),
            nausea: m(&p.nausea),
            ruq: m(&p.ruq),
            back_radiation: m(&p.back_radiation),
            alcohol_use: m(&p.alcohol),
            reproducible_with_palpation: m(&p.reproducible),
            point_tenderness: m(&p.point_tenderness),
            sharp: m(&p.sharp),
            worse_with_breathing: m(&p.worse_breathing),
            worse_with_movement: m(&p.worse_movement),
            recent_exertion_or_trauma: m(&p.exertion_trauma),
            unilateral: m(&p.unilateral),
            recent_trauma: m(&p.trauma),
            swelling: m(&p.swelling),
            leg_swelling: m(&p.leg_swelling),
            recent_surgery_or_immobilization: m(&p.surgery_immobilization),
            hemoptysis: m(&p.hemoptysis),
            dyspnea: m(&p.dyspnea),
            sudden_onset: m(&p.sudden_onset),
            pleuritic: m(&p.pleuritic),
            cough: m(&p.cough),
            nsaid_use: m(&p.nsaid),

            history_gerd: icd_matches_any(&record.icd_codes, ICD_GERD),
            history_pud: icd_matches_any(&record.icd_codes, ICD_ULCER),
            history_gallstones: icd_matches_any(&record.icd_codes, ICD_CHOLELITHIASIS),
            cardiac_risk_factor_count: cardiac_risk_factor_count(&record.icd_codes),

            wbc: record.latest_lab(LabName::WBC),
            lipase: record.latest_lab(LabName::Lipase),
            amylase: record.latest_lab(LabName::Amylase),
            d_dimer: record.latest_lab(LabName::DDimer),
            troponin_latest,
            troponin_trend,
            normal_troponin,
            creatinine: record.latest_lab(LabName::Creatinine),
            platelets: record.latest_lab(LabName::Platelets),
        }
    }

    /// Whether the given ICD code set indicates pre-existing pancreatitis
    /// risk (gallstones/alcohol are read off `ClinicalFeatures` directly;
    /// this is exposed for the pancreatitis scorer's two-of-three criteria).
    pub fn has_pancreatitis_history(record: &PatientRecord) -> bool {
        icd_matches_any(&record.icd_codes, ICD_PANCREATITIS)
    }
}

/// Split at the midpoint, average each half, classify rising/falling/stable
/// (spec.md §4.1). Fewer than two points yields `Unknown`.
pub fn classify_troponin_trend(values: &[f64]) -> TroponinTrend {
    if values.len() < 2 {
        return TroponinTrend::Unknown;
    }
    let mid = values.len() / 2;
    let (first_half, second_half) = values.split_at(mid);
    let avg = |s: &[f64]| s.iter().sum::<f64>() / s.len() as f64;
    let first = avg(first_half);
    let second = avg(second_half);
    if first == 0.0 {
        return if second > 0.0 {
            TroponinTrend::Rising
        } else {
            TroponinTrend::Stable
        };
    }
    let ratio = second / first;
    if ratio > 1.2 {
        TroponinTrend::Rising
    } else if ratio < 0.8 {
        TroponinTrend::Falling
    } else {
        TroponinTrend::Stable
    }
}

/// Kinds DiagnosisResult may reference, used by FeatureExtractor callers to
/// avoid importing `DiagnosisKind` just for a log line.
pub fn diagnosis_label(kind: DiagnosisKind) -> String {
    kind.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn troponin_trend_rising() {
        assert_eq!(classify_troponin_trend(&[0.1, 0.2, 0.3, 0.4]), TroponinTrend::Rising);
    }

    #[test]
    fn troponin_trend_falling() {
        assert_eq!(classify_troponin_trend(&[0.4, 0.3, 0.1, 0.05]), TroponinTrend::Falling);
    }

    #[test]
    fn troponin_trend_stable() {
        assert_eq!(classify_troponin_trend(&[0.12, 0.12, 0.13, 0.12]), TroponinTrend::Stable);
    }

    #[test]
    fn troponin_trend_needs_two_points() {
        assert_eq!(classify_troponin_trend(&[0.12]), TroponinTrend::Unknown);
        assert_eq!(classify_troponin_trend(&[]), TroponinTrend::Unknown);
    }

    #[test]
    fn icd_normalization_matches_dotted_and_undotted() {
        let mut codes = std::collections::HashSet::new();
        codes.insert("530.1".to_string());
        assert!(icd_matches_any(&codes, ICD_GERD));
    }
}
