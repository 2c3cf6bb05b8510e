//! HealthTwin — per-patient, per-metric learned baselines (spec.md §4.7).
//!
//! Grounded on the teacher's `baseline::BaselineAccumulator` (Welford
//! online mean/variance) and `DynamicThresholds` z-score machinery
//! (`src/baseline/mod.rs`), generalized from a single equipment-wide
//! accumulator keyed by `(equipment_id, sensor_id)` to one keyed by
//! `(patient_id, metric)`, and from a fixed warning/critical sigma pair to
//! the four-bucket severity ladder in `crate::types::AnomalySeverity`.
//!
//! Shared-resource policy (spec.md §5): a `(patient_id -> Baseline map)`
//! guarded so that `add_sample`/`check_anomaly` against the same patient are
//! mutually exclusive, while distinct patients never contend. `DashMap`
//! shards its internal table across stripes, so two patients hashing to
//! different shards never block each other — the concurrency shape the
//! teacher reaches for whenever many independent keys need independent
//! locks (its `Cargo.toml` already carries `dashmap` for exactly this).

use crate::config;
use crate::types::{AnomalyRecord, AnomalySeverity, Baseline, BaselineStatus, StreamMetric, VitalSample};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;

struct MetricAccumulator {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
    p5: f64,
    p95: f64,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    reservoir: Vec<f64>,
}

const RESERVOIR_CAP: usize = 2000;

impl MetricAccumulator {
    fn new(value: f64, now: DateTime<Utc>) -> Self {
        Self {
            count: 1,
            mean: value,
            m2: 0.0,
            min: value,
            max: value,
            p5: value,
            p95: value,
            created_at: now,
            last_updated: now,
            reservoir: vec![value],
        }
    }

    /// Welford's online algorithm (spec.md §4.7).
    fn add(&mut self, value: f64, now: DateTime<Utc>, recompute_every: usize) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.last_updated = now;

        if self.reservoir.len() < RESERVOIR_CAP {
            self.reservoir.push(value);
        } else {
            let slot = (self.count as usize) % RESERVOIR_CAP;
            self.reservoir[slot] = value;
        }

        if recompute_every > 0 && self.count as usize % recompute_every == 0 {
            self.recompute_percentiles();
        }
    }

    fn recompute_percentiles(&mut self) {
        let mut sorted = self.reservoir.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        self.p5 = percentile(&sorted, 0.05);
        self.p95 = percentile(&sorted, 0.95);
    }

    fn std(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / self.count as f64).sqrt()
        }
    }

    fn snapshot(&self) -> Baseline {
        Baseline {
            mean: self.mean,
            std: self.std(),
            min: self.min,
            max: self.max,
            p5: self.p5,
            p95: self.p95,
            sample_count: self.count,
            last_updated: self.last_updated,
            created_at: self.created_at,
        }
    }
}

fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * pct).round() as usize;
    sorted[idx]
}

#[derive(Default)]
struct PatientBaselines {
    metrics: HashMap<StreamMetric, MetricAccumulator>,
}

pub struct HealthTwin {
    patients: DashMap<String, PatientBaselines>,
}

impl Default for HealthTwin {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthTwin {
    pub fn new() -> Self {
        Self { patients: DashMap::new() }
    }

    /// Update every metric present in `sample` (spec.md §4.7 `add_sample`).
    /// Create-on-first-sample: the first sample for a patient establishes
    /// their baseline entry.
    pub async fn add_sample(&self, patient_id: &str, sample: &VitalSample) {
        let recompute_every = config::get().baseline_recompute_every;
        let mut patient = self.patients.entry(patient_id.to_string()).or_default();
        for (metric, value) in sample.present_metrics() {
            patient
                .metrics
                .entry(metric)
                .and_modify(|acc| acc.add(value, sample.timestamp, recompute_every))
                .or_insert_with(|| MetricAccumulator::new(value, sample.timestamp));
        }
    }

    /// A read-only snapshot of one metric's baseline, if it exists.
    pub async fn baseline(&self, patient_id: &str, metric: StreamMetric) -> Option<Baseline> {
        self.patients.get(patient_id).and_then(|p| p.metrics.get(&metric).map(MetricAccumulator::snapshot))
    }

    /// `check_anomaly` (spec.md §4.7): z-score anomalies against a mature
    /// `std > 0` baseline, plus hard checks that apply even to a
    /// single-sample (`std == 0`) baseline.
    pub async fn check_anomaly(&self, patient_id: &str, vitals: &VitalSample) -> (bool, f64, Vec<AnomalyRecord>) {
        let Some(patient) = self.patients.get(patient_id) else {
            return (false, 0.0, Vec::new());
        };

        let mut records = Vec::new();
        for (metric, value) in vitals.present_metrics() {
            let Some(acc) = patient.metrics.get(&metric) else { continue };
            let std = acc.std();
            if std > 0.0 {
                let z = (value - acc.mean) / std;
                if z.abs() > 2.0 {
                    records.push(AnomalyRecord {
                        metric,
                        value,
                        z_score: z,
                        severity: AnomalySeverity::from_abs_z(z.abs()),
                        baseline_mean: acc.mean,
                        baseline_std: std,
                    });
                }
            }
            if let Some(hard) = hard_check(metric, value, acc) {
                records.push(hard);
            }
        }

        let risk_score = if records.is_empty() {
            0.0
        } else {
            (records.iter().map(|r| r.severity.weight()).sum::<f64>() / records.len() as f64).min(1.0)
        };

        (!records.is_empty(), risk_score, records)
    }

    pub async fn status(&self, patient_id: &str, metric: StreamMetric, now: DateTime<Utc>) -> Option<BaselineStatus> {
        self.baseline(patient_id, metric).await.map(|b| b.status(now))
    }
}

/// Hard checks that do not require `std > 0` (spec.md §4.7 "Additionally,
/// without requiring mature baselines..."): HRV drop > 15% of the baseline
/// midpoint; HR above `baseline_max + 15`; SpO2 below `baseline_min - 2`.
fn hard_check(metric: StreamMetric, value: f64, acc: &MetricAccumulator) -> Option<AnomalyRecord> {
    let triggered = match metric {
        StreamMetric::HrvRmssd => {
            let midpoint = (acc.min + acc.max) / 2.0;
            midpoint > 0.0 && value < midpoint * 0.85
        }
        StreamMetric::HeartRate => value > acc.max + 15.0,
        StreamMetric::Spo2 => value < acc.min - 2.0,
        _ => false,
    };
    if !triggered {
        return None;
    }
    let std = acc.std();
    let z = if std > 0.0 { (value - acc.mean) / std } else { 0.0 };
    Some(AnomalyRecord {
        metric,
        value,
        z_score: z,
        severity: AnomalySeverity::High,
        baseline_mean: acc.mean,
        baseline_std: std,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(patient: &str, hr: f64, t: DateTime<Utc>) -> VitalSample {
        VitalSample {
            patient_id: patient.to_string(),
            timestamp: t,
            heart_rate: Some(hr),
            hrv_rmssd: None,
            spo2: None,
            respiratory_rate: None,
            bp_sys: None,
            bp_dia: None,
            data_source: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn baseline_converges_for_a_stationary_source() {
        config::ensure_test_config();
        let twin = HealthTwin::new();
        let t0 = Utc::now();
        // Deterministic alternating sequence with mean 63, std close to 5.
        for i in 0..2000u32 {
            let v = 63.0 + if i % 2 == 0 { 5.0 } else { -5.0 };
            let sample = sample("DEMO_001", v, t0 + Duration::seconds(i as i64));
            twin.add_sample("DEMO_001", &sample).await;
        }
        let baseline = twin.baseline("DEMO_001", StreamMetric::HeartRate).await.unwrap();
        assert!((baseline.mean - 63.0).abs() < 0.5, "mean = {}", baseline.mean);
        assert!((baseline.std - 5.0).abs() < 0.5, "std = {}", baseline.std);
    }

    #[tokio::test]
    async fn distinct_patients_do_not_share_baselines() {
        config::ensure_test_config();
        let twin = HealthTwin::new();
        let t0 = Utc::now();
        twin.add_sample("A", &sample("A", 60.0, t0)).await;
        twin.add_sample("B", &sample("B", 140.0, t0)).await;
        let a = twin.baseline("A", StreamMetric::HeartRate).await.unwrap();
        let b = twin.baseline("B", StreamMetric::HeartRate).await.unwrap();
        assert_eq!(a.mean, 60.0);
        assert_eq!(b.mean, 140.0);
    }

    #[tokio::test]
    async fn hard_check_fires_without_a_mature_baseline() {
        config::ensure_test_config();
        let twin = HealthTwin::new();
        let t0 = Utc::now();
        twin.add_sample("C", &sample("C", 60.0, t0)).await;
        let probe = sample("C", 90.0, t0 + Duration::seconds(1));
        let (is_anomaly, _risk, records) = twin.check_anomaly("C", &probe).await;
        assert!(is_anomaly);
        assert!(records.iter().any(|r| r.metric == StreamMetric::HeartRate));
    }
}
