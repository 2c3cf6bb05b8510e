//! Streaming-ingestion types: `VitalSample`, `Baseline`, anomaly records,
//! and the `Alert` envelope (spec.md §3/§4.7/§4.8/§6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single sample from a mobile sensor source (spec.md §3).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VitalSample {
    pub patient_id: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub heart_rate: Option<f64>,
    pub hrv_rmssd: Option<f64>,
    pub spo2: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub bp_sys: Option<f64>,
    pub bp_dia: Option<f64>,
    #[serde(default = "default_source")]
    pub data_source: String,
}

fn default_source() -> String {
    "unknown".to_string()
}

/// The metrics a [`VitalSample`] may carry, used to key per-patient baselines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMetric {
    HeartRate,
    HrvRmssd,
    Spo2,
    RespiratoryRate,
    BpSys,
    BpDia,
}

impl std::fmt::Display for StreamMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StreamMetric::HeartRate => "heart_rate",
            StreamMetric::HrvRmssd => "hrv_rmssd",
            StreamMetric::Spo2 => "spo2",
            StreamMetric::RespiratoryRate => "respiratory_rate",
            StreamMetric::BpSys => "bp_sys",
            StreamMetric::BpDia => "bp_dia",
        };
        write!(f, "{s}")
    }
}

impl VitalSample {
    /// Extract the `(metric, value)` pairs present in this sample.
    pub fn present_metrics(&self) -> Vec<(StreamMetric, f64)> {
        let mut out = Vec::with_capacity(6);
        if let Some(v) = self.heart_rate {
            out.push((StreamMetric::HeartRate, v));
        }
        if let Some(v) = self.hrv_rmssd {
            out.push((StreamMetric::HrvRmssd, v));
        }
        if let Some(v) = self.spo2 {
            out.push((StreamMetric::Spo2, v));
        }
        if let Some(v) = self.respiratory_rate {
            out.push((StreamMetric::RespiratoryRate, v));
        }
        if let Some(v) = self.bp_sys {
            out.push((StreamMetric::BpSys, v));
        }
        if let Some(v) = self.bp_dia {
            out.push((StreamMetric::BpDia, v));
        }
        out
    }

    /// Sanity range per metric, mirroring `VitalName::sanity_range` for the
    /// subset of vitals the streaming path also carries (spec.md §3).
    pub fn sanity_range(metric: StreamMetric) -> Option<(f64, f64)> {
        match metric {
            StreamMetric::HeartRate => Some((20.0, 250.0)),
            StreamMetric::Spo2 => Some((50.0, 100.0)),
            StreamMetric::RespiratoryRate => Some((4.0, 60.0)),
            StreamMetric::BpSys => Some((30.0, 300.0)),
            StreamMetric::BpDia => Some((10.0, 200.0)),
            // HRV has no clinically-agreed sanity clamp in the spec; accept any value.
            StreamMetric::HrvRmssd => None,
        }
    }
}

/// Learning maturity of a per-patient, per-metric [`Baseline`] (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BaselineStatus {
    /// < 7 days of history.
    Learning,
    /// < 30 days.
    Preliminary,
    /// < 90 days.
    Established,
    /// >= 90 days.
    Mature,
}

impl std::fmt::Display for BaselineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BaselineStatus::Learning => "learning",
            BaselineStatus::Preliminary => "preliminary",
            BaselineStatus::Established => "established",
            BaselineStatus::Mature => "mature",
        };
        write!(f, "{s}")
    }
}

/// Per-patient, per-metric learned baseline (spec.md §3/§4.7).
#[derive(Debug, Clone, Serialize)]
pub struct Baseline {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p5: f64,
    pub p95: f64,
    pub sample_count: u64,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Baseline {
    /// Learning status by age, per spec.md §4.7.
    pub fn status(&self, now: DateTime<Utc>) -> BaselineStatus {
        let age_days = (now - self.created_at).num_seconds() as f64 / 86_400.0;
        if age_days < 7.0 {
            BaselineStatus::Learning
        } else if age_days < 30.0 {
            BaselineStatus::Preliminary
        } else if age_days < 90.0 {
            BaselineStatus::Established
        } else {
            BaselineStatus::Mature
        }
    }

    /// `(min(age_days/90,1) + min(samples/1000,1)) / 2`, per spec.md §4.7.
    pub fn confidence(&self, now: DateTime<Utc>) -> f64 {
        let age_days = ((now - self.created_at).num_seconds() as f64 / 86_400.0).max(0.0);
        let age_term = (age_days / 90.0).min(1.0);
        let sample_term = (self.sample_count as f64 / 1000.0).min(1.0);
        (age_term + sample_term) / 2.0
    }
}

/// Severity bucket for a single-metric z-score anomaly (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnomalySeverity {
    Low,
    Moderate,
    High,
    Critical,
}

impl AnomalySeverity {
    /// `low:|z|≤2.5, moderate:≤3, high:≤3.5, critical:>3.5`, per spec.md §4.7.
    /// Only called once `|z| > 2.0` has already been established.
    pub fn from_abs_z(abs_z: f64) -> Self {
        if abs_z <= 2.5 {
            AnomalySeverity::Low
        } else if abs_z <= 3.0 {
            AnomalySeverity::Moderate
        } else if abs_z <= 3.5 {
            AnomalySeverity::High
        } else {
            AnomalySeverity::Critical
        }
    }

    /// Numeric weight used to average severities into an overall risk score.
    pub fn weight(self) -> f64 {
        match self {
            AnomalySeverity::Low => 0.25,
            AnomalySeverity::Moderate => 0.5,
            AnomalySeverity::High => 0.75,
            AnomalySeverity::Critical => 1.0,
        }
    }
}

/// A single metric's anomaly finding (spec.md §4.7).
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyRecord {
    pub metric: StreamMetric,
    pub value: f64,
    pub z_score: f64,
    pub severity: AnomalySeverity,
    pub baseline_mean: f64,
    pub baseline_std: f64,
}

/// Risk level reported by the LLM backend / deterministic fallback (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamRiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl StreamRiskLevel {
    pub fn is_alertable(self) -> bool {
        matches!(self, StreamRiskLevel::High | StreamRiskLevel::Critical)
    }
}

impl std::fmt::Display for StreamRiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StreamRiskLevel::Low => "LOW",
            StreamRiskLevel::Moderate => "MODERATE",
            StreamRiskLevel::High => "HIGH",
            StreamRiskLevel::Critical => "CRITICAL",
        };
        write!(f, "{s}")
    }
}

/// Alert envelope delivered to an [`crate::alerts::AlertSink`] (spec.md §6).
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    pub patient_id: String,
    pub diagnosis: String,
    pub confidence: f64,
    pub risk_level: StreamRiskLevel,
    pub vitals: VitalSample,
    pub actions_taken: Vec<String>,
}

/// The fixed ordered action list every alert carries (spec.md §4.8 step 5).
pub fn fixed_alert_actions() -> Vec<String> {
    vec![
        "SMS to emergency contact".to_string(),
        "ER notification".to_string(),
        "Push notification".to_string(),
        "Chatbot activation".to_string(),
    ]
}
