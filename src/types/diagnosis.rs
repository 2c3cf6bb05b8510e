//! `DiagnosisResult` and the closed sets it is built from.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed set of diagnosis kinds (Glossary, spec.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosisKind {
    Stemi,
    Nstemi,
    UnstableAngina,
    StableAngina,
    Pericarditis,
    Myocarditis,
    Gerd,
    Pud,
    EsophagealSpasm,
    BiliaryColic,
    Pancreatitis,
    Pe,
    MassivePe,
    Pneumothorax,
    Pneumonia,
    Pleuritis,
    Costochondritis,
    MuscleStrain,
    RibFracture,
    PanicAttack,
    Anxiety,
    NonCardiacChestPain,
    Unknown,
}

impl std::fmt::Display for DiagnosisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DiagnosisKind::Stemi => "STEMI",
            DiagnosisKind::Nstemi => "NSTEMI",
            DiagnosisKind::UnstableAngina => "Unstable Angina",
            DiagnosisKind::StableAngina => "Stable Angina",
            DiagnosisKind::Pericarditis => "Pericarditis",
            DiagnosisKind::Myocarditis => "Myocarditis",
            DiagnosisKind::Gerd => "GERD",
            DiagnosisKind::Pud => "Peptic Ulcer Disease",
            DiagnosisKind::EsophagealSpasm => "Esophageal Spasm",
            DiagnosisKind::BiliaryColic => "Biliary Colic",
            DiagnosisKind::Pancreatitis => "Pancreatitis",
            DiagnosisKind::Pe => "Pulmonary Embolism",
            DiagnosisKind::MassivePe => "Massive Pulmonary Embolism",
            DiagnosisKind::Pneumothorax => "Pneumothorax",
            DiagnosisKind::Pneumonia => "Pneumonia",
            DiagnosisKind::Pleuritis => "Pleuritis",
            DiagnosisKind::Costochondritis => "Costochondritis",
            DiagnosisKind::MuscleStrain => "Muscle Strain",
            DiagnosisKind::RibFracture => "Rib Fracture",
            DiagnosisKind::PanicAttack => "Panic Attack",
            DiagnosisKind::Anxiety => "Anxiety",
            DiagnosisKind::NonCardiacChestPain => "Non-Cardiac Chest Pain",
            DiagnosisKind::Unknown => "Unknown",
        };
        write!(f, "{s}")
    }
}

/// Closed set of risk levels (Glossary, spec.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    /// Priority used by orchestrator consolidation (spec.md §4.4):
    /// `{CRITICAL:4, HIGH:3, MODERATE:2, LOW:1}`.
    pub fn priority(self) -> u8 {
        match self {
            RiskLevel::Critical => 4,
            RiskLevel::High => 3,
            RiskLevel::Moderate => 2,
            RiskLevel::Low => 1,
        }
    }

    /// Whether this risk level is life-threatening in the orchestrator's
    /// partitioning sense (CRITICAL or HIGH).
    pub fn is_life_threatening(self) -> bool {
        matches!(self, RiskLevel::Critical | RiskLevel::High)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Critical => "CRITICAL",
            RiskLevel::High => "HIGH",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::Low => "LOW",
        };
        write!(f, "{s}")
    }
}

/// Closed set of specialty tags (Glossary, spec.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialtyTag {
    Safety,
    Cardiology,
    Gastroenterology,
    Musculoskeletal,
    Pulmonary,
}

impl std::fmt::Display for SpecialtyTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SpecialtyTag::Safety => "Safety",
            SpecialtyTag::Cardiology => "Cardiology",
            SpecialtyTag::Gastroenterology => "Gastroenterology",
            SpecialtyTag::Musculoskeletal => "Musculoskeletal",
            SpecialtyTag::Pulmonary => "Pulmonary",
        };
        write!(f, "{s}")
    }
}

/// A feature value captured for audit (`supporting_evidence`). Clinical
/// features are a mix of booleans, counts, and continuous measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvidenceValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<bool> for EvidenceValue {
    fn from(v: bool) -> Self {
        EvidenceValue::Bool(v)
    }
}
impl From<f64> for EvidenceValue {
    fn from(v: f64) -> Self {
        EvidenceValue::Number(v)
    }
}
impl From<&str> for EvidenceValue {
    fn from(v: &str) -> Self {
        EvidenceValue::Text(v.to_string())
    }
}

/// Output of any agent (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub diagnosis_kind: DiagnosisKind,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub reasoning: String,
    pub recommendations: Vec<String>,
    pub supporting_evidence: HashMap<String, EvidenceValue>,
    pub agent_name: String,
    pub depth: u8,
    pub children: Vec<DiagnosisResult>,
}

impl DiagnosisResult {
    /// Construct a zero-confidence, low-risk placeholder used when an agent
    /// has nothing to report (spec.md §4.2 step 4, "generic fallback").
    pub fn fallback(agent_name: &str, depth: u8, risk_level: RiskLevel, message: &str) -> Self {
        DiagnosisResult {
            diagnosis_kind: DiagnosisKind::Unknown,
            confidence: 0.0,
            risk_level,
            reasoning: message.to_string(),
            recommendations: vec!["Clinical correlation recommended".to_string()],
            supporting_evidence: HashMap::new(),
            agent_name: agent_name.to_string(),
            depth,
            children: Vec::new(),
        }
    }

    /// Clamp confidence into `[0, 1]` (spec.md P2 / §4.3 "scores are capped
    /// to 1.0"). Applied once at the point of construction, not scattered
    /// through every scorer.
    pub fn clamp_confidence(mut self) -> Self {
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }
}
