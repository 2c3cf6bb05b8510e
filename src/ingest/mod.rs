//! RealtimeIngestor — the streaming vitals pipeline (spec.md §4.8).
//!
//! One API entry, `ingest(sample)`: sanity-clamp, ring-buffer append,
//! `HealthTwin` update, anomaly check, conditional LLM call with deadline
//! and deterministic fallback, conditional alert fan-out, progress
//! broadcast. Collaborators (`HealthTwin`, `LLMBackend`, `AlertSink`,
//! `ProgressBus`) are constructed by the caller and passed in — spec.md §5's
//! "no global mutable singletons in the core" — mirroring the teacher's
//! `VibrationProcessor::run(rx, state, shutdown)` collaborator-injection shape.

use crate::alerts::{AgentUpdateStatus, AlertSink, ProgressBus, ProgressEvent};
use crate::config;
use crate::error::IngestError;
use crate::features::{ClinicalFeatures, FeatureExtractor};
use crate::health_twin::HealthTwin;
use crate::llm::{deterministic_fallback, LLMBackend};
use crate::types::{Alert, PatientRecord, PatientRecordWire, Sex, StreamMetric, StreamRiskLevel, VitalSample};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Outcome of a single `ingest` call, shaped after the `/vitals` response in
/// spec.md §6. `diagnosis`/`confidence`/`risk_level` are only populated when
/// `is_anomaly` is true.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub status: &'static str,
    pub is_anomaly: bool,
    pub risk_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<StreamRiskLevel>,
    pub alert_sent: bool,
}

pub struct RealtimeIngestor {
    health_twin: Arc<HealthTwin>,
    llm: Arc<dyn LLMBackend>,
    alert_sink: Arc<dyn AlertSink>,
    progress: Arc<ProgressBus>,
    ring_buffers: DashMap<String, Mutex<VecDeque<VitalSample>>>,
}

impl RealtimeIngestor {
    pub fn new(health_twin: Arc<HealthTwin>, llm: Arc<dyn LLMBackend>, alert_sink: Arc<dyn AlertSink>, progress: Arc<ProgressBus>) -> Self {
        Self {
            health_twin,
            llm,
            alert_sink,
            progress,
            ring_buffers: DashMap::new(),
        }
    }

    /// A consistent snapshot of the most recent samples for a patient
    /// (spec.md §5: "readers observe a consistent snapshot via copy").
    pub fn recent_samples(&self, patient_id: &str) -> Vec<VitalSample> {
        self.ring_buffers
            .get(patient_id)
            .map(|buf| buf.lock().expect("ring buffer mutex poisoned").iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn ingest(&self, raw: VitalSample) -> Result<IngestOutcome, IngestError> {
        if raw.patient_id.trim().is_empty() {
            return Err(IngestError::Validation(crate::error::ValidationError::EmptyPatientId));
        }
        let patient_id = raw.patient_id.clone();
        let sample = sanity_clamp(raw);

        self.append_ring_buffer(&patient_id, sample.clone());
        self.health_twin.add_sample(&patient_id, &sample).await;

        self.progress.publish(ProgressEvent::AgentUpdate {
            agent_id: "ingestor".to_string(),
            status: AgentUpdateStatus::Processing,
            progress: 40,
            patient_id: patient_id.clone(),
        });

        let (is_anomaly, risk_score, records) = self.health_twin.check_anomaly(&patient_id, &sample).await;

        if !is_anomaly {
            self.progress.publish(ProgressEvent::AnalysisComplete {
                patient_id: patient_id.clone(),
                summary: serde_json::json!({"outcome": "normal", "risk_score": risk_score}),
            });
            return Ok(IngestOutcome {
                status: "success",
                is_anomaly: false,
                risk_score,
                diagnosis: None,
                confidence: None,
                risk_level: None,
                alert_sent: false,
            });
        }

        let features = pseudo_features(&sample);
        let interpretation = match tokio::time::timeout(
            config::get().llm_deadline(),
            self.llm.analyze_medical_vitals(&patient_id, &sample, &features),
        )
        .await
        {
            Ok(Ok(interp)) => interp,
            Ok(Err(err)) => {
                tracing::warn!(patient_id = %patient_id, error = %err, "LLM backend returned an error, using deterministic fallback");
                deterministic_fallback(risk_score)
            }
            Err(_) => {
                tracing::warn!(patient_id = %patient_id, "LLM backend timed out, using deterministic fallback");
                deterministic_fallback(risk_score)
            }
        };

        self.progress.publish(ProgressEvent::AgentUpdate {
            agent_id: "ingestor".to_string(),
            status: AgentUpdateStatus::Complete,
            progress: 90,
            patient_id: patient_id.clone(),
        });

        let mut alert_sent = false;
        if interpretation.risk_level.is_alertable() {
            let alert = Alert {
                timestamp: sample.timestamp,
                patient_id: patient_id.clone(),
                diagnosis: interpretation.diagnosis.clone(),
                confidence: interpretation.confidence,
                risk_level: interpretation.risk_level,
                vitals: sample.clone(),
                actions_taken: crate::types::fixed_alert_actions(),
            };
            match self.alert_sink.fanout(alert).await {
                Ok(()) => alert_sent = true,
                Err(err) => tracing::warn!(patient_id = %patient_id, error = %err, "alert delivery failed"),
            }
        }

        self.progress.publish(ProgressEvent::AnalysisComplete {
            patient_id: patient_id.clone(),
            summary: serde_json::json!({
                "outcome": "anomaly",
                "diagnosis": interpretation.diagnosis,
                "risk_level": interpretation.risk_level.to_string(),
                "anomaly_count": records.len(),
            }),
        });

        Ok(IngestOutcome {
            status: "success",
            is_anomaly: true,
            risk_score,
            diagnosis: Some(interpretation.diagnosis),
            confidence: Some(interpretation.confidence),
            risk_level: Some(interpretation.risk_level),
            alert_sent,
        })
    }

    fn append_ring_buffer(&self, patient_id: &str, sample: VitalSample) {
        let cap = config::get().ring_buffer_size;
        let entry = self.ring_buffers.entry(patient_id.to_string()).or_insert_with(|| Mutex::new(VecDeque::with_capacity(cap)));
        let mut buf = entry.lock().expect("ring buffer mutex poisoned");
        if buf.len() >= cap {
            buf.pop_front();
        }
        buf.push_back(sample);
    }
}

/// Drop out-of-range fields rather than rejecting the whole sample (spec.md
/// §4.8 step 1, §7 stream-path validation policy).
fn sanity_clamp(mut sample: VitalSample) -> VitalSample {
    if !in_range(sample.heart_rate, StreamMetric::HeartRate) {
        sample.heart_rate = None;
    }
    if !in_range(sample.spo2, StreamMetric::Spo2) {
        sample.spo2 = None;
    }
    if !in_range(sample.respiratory_rate, StreamMetric::RespiratoryRate) {
        sample.respiratory_rate = None;
    }
    if !in_range(sample.bp_sys, StreamMetric::BpSys) {
        sample.bp_sys = None;
    }
    if !in_range(sample.bp_dia, StreamMetric::BpDia) {
        sample.bp_dia = None;
    }
    sample
}

fn in_range(value: Option<f64>, metric: StreamMetric) -> bool {
    match (value, VitalSample::sanity_range(metric)) {
        (Some(v), Some((min, max))) => v >= min && v <= max,
        (Some(_), None) => true,
        (None, _) => true,
    }
}

/// The specialty agents consume a full `PatientRecord`-derived
/// `ClinicalFeatures`; the streaming path only has a bare `VitalSample`, so
/// this builds the minimal feature set the LLM prompt needs from an
/// otherwise-empty synthetic record. Not used by any specialty agent.
fn pseudo_features(sample: &VitalSample) -> ClinicalFeatures {
    let wire = PatientRecordWire {
        patient_id: sample.patient_id.clone(),
        hadm_id: None,
        age: 0,
        sex: Sex::Other,
        chief_complaint: String::new(),
        vitals: HashMap::new(),
        labs: HashMap::new(),
        icd_codes: HashSet::new(),
        admission_time: sample.timestamp,
    };
    let record: PatientRecord = wire.try_into().unwrap_or_else(|_| {
        PatientRecord::try_from(PatientRecordWire {
            patient_id: "unknown".to_string(),
            hadm_id: None,
            age: 0,
            sex: Sex::Other,
            chief_complaint: String::new(),
            vitals: HashMap::new(),
            labs: HashMap::new(),
            icd_codes: HashSet::new(),
            admission_time: sample.timestamp,
        })
        .expect("empty patient record is always valid")
    });
    FeatureExtractor::extract(&record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::LoggingAlertSink;
    use crate::llm::MockBackend;
    use chrono::Utc;

    fn sample(hr: f64) -> VitalSample {
        VitalSample {
            patient_id: "P1".to_string(),
            timestamp: Utc::now(),
            heart_rate: Some(hr),
            hrv_rmssd: None,
            spo2: None,
            respiratory_rate: None,
            bp_sys: None,
            bp_dia: None,
            data_source: "test".to_string(),
        }
    }

    fn ingestor() -> RealtimeIngestor {
        config::ensure_test_config();
        RealtimeIngestor::new(
            Arc::new(HealthTwin::new()),
            Arc::new(MockBackend),
            Arc::new(LoggingAlertSink::new()),
            Arc::new(ProgressBus::new(16)),
        )
    }

    #[tokio::test]
    async fn out_of_range_heart_rate_is_dropped_not_rejected() {
        let ingestor = ingestor();
        let mut s = sample(999.0);
        s.heart_rate = Some(999.0);
        let outcome = ingestor.ingest(s).await.unwrap();
        assert_eq!(outcome.status, "success");
    }

    #[tokio::test]
    async fn first_sample_is_never_anomalous() {
        let ingestor = ingestor();
        let outcome = ingestor.ingest(sample(72.0)).await.unwrap();
        assert!(!outcome.is_anomaly);
        assert!(outcome.diagnosis.is_none());
    }

    #[tokio::test]
    async fn ring_buffer_caps_at_configured_size() {
        let ingestor = ingestor();
        for i in 0..350 {
            ingestor.ingest(sample(60.0 + (i % 5) as f64)).await.unwrap();
        }
        let snapshot = ingestor.recent_samples("P1");
        assert!(snapshot.len() <= config::get().ring_buffer_size);
    }

    #[tokio::test]
    async fn empty_patient_id_is_rejected() {
        let ingestor = ingestor();
        let mut s = sample(72.0);
        s.patient_id = String::new();
        let err = ingestor.ingest(s).await.unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }
}
