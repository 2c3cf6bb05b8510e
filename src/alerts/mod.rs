//! `AlertSink` fan-out and the `ProgressBus` broadcast channel (spec.md §6).
//!
//! Grounded on the teacher's channel-based collaborator wiring
//! (`tokio::sync::mpsc` pairs passed into `VibrationProcessor::run` rather
//! than held as globals — see `src/pipeline/processor.rs`): collaborators
//! are constructed once and handed to whoever needs them, never reached for
//! through a singleton (spec.md §5 "no global mutable singletons").

use crate::error::AlertDeliveryFailure;
use crate::types::Alert;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Delivers an [`Alert`] to whatever out-of-band notification channel is
/// configured (SMS gateway, paging system, push service...). Implementations
/// must not retry inline (spec.md §7): a failure is surfaced as
/// [`AlertDeliveryFailure`] and the caller proceeds regardless.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn fanout(&self, alert: Alert) -> Result<(), AlertDeliveryFailure>;
}

/// Logs the alert and retains it in memory for inspection — the default
/// sink until a real paging integration is wired in (spec.md §6's
/// `actions_taken` list is advisory, not itself an integration).
pub struct LoggingAlertSink {
    sent: Mutex<Vec<Alert>>,
}

impl Default for LoggingAlertSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingAlertSink {
    pub fn new() -> Self {
        Self { sent: Mutex::new(Vec::new()) }
    }

    /// Snapshot of every alert delivered so far. Test/inspection hook.
    pub fn sent(&self) -> Vec<Alert> {
        self.sent.lock().expect("alert sink mutex poisoned").clone()
    }
}

#[async_trait]
impl AlertSink for LoggingAlertSink {
    async fn fanout(&self, alert: Alert) -> Result<(), AlertDeliveryFailure> {
        tracing::warn!(
            patient_id = %alert.patient_id,
            diagnosis = %alert.diagnosis,
            risk_level = %alert.risk_level,
            confidence = alert.confidence,
            "alert fanout"
        );
        self.sent.lock().expect("alert sink mutex poisoned").push(alert);
        Ok(())
    }
}

/// Progress events emitted over the WebSocket/subscription channel
/// (spec.md §6).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    AgentUpdate {
        agent_id: String,
        status: AgentUpdateStatus,
        progress: u8,
        patient_id: String,
    },
    AnalysisComplete {
        patient_id: String,
        summary: serde_json::Value,
    },
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentUpdateStatus {
    Analyzing,
    Processing,
    Complete,
    Error,
}

/// Broadcast bus for progress events. A `tokio::sync::broadcast` channel:
/// late subscribers simply miss earlier events rather than blocking
/// publishers, which is the right tradeoff for a best-effort UI feed.
pub struct ProgressBus {
    tx: broadcast::Sender<ProgressEvent>,
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ProgressBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Best-effort publish: with no subscribers this is a no-op, not an error.
    pub fn publish(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StreamRiskLevel, VitalSample};
    use chrono::Utc;

    fn sample_alert() -> Alert {
        Alert {
            timestamp: Utc::now(),
            patient_id: "P1".to_string(),
            diagnosis: "NSTEMI-suspected".to_string(),
            confidence: 0.8,
            risk_level: StreamRiskLevel::Critical,
            vitals: VitalSample {
                patient_id: "P1".to_string(),
                timestamp: Utc::now(),
                heart_rate: Some(120.0),
                hrv_rmssd: None,
                spo2: None,
                respiratory_rate: None,
                bp_sys: None,
                bp_dia: None,
                data_source: "test".to_string(),
            },
            actions_taken: crate::types::fixed_alert_actions(),
        }
    }

    #[tokio::test]
    async fn logging_sink_retains_delivered_alerts() {
        let sink = LoggingAlertSink::new();
        sink.fanout(sample_alert()).await.unwrap();
        assert_eq!(sink.sent().len(), 1);
    }

    #[tokio::test]
    async fn progress_bus_delivers_to_subscribers() {
        let bus = ProgressBus::new(16);
        let mut rx = bus.subscribe();
        bus.publish(ProgressEvent::AgentUpdate {
            agent_id: "ingestor".to_string(),
            status: AgentUpdateStatus::Complete,
            progress: 100,
            patient_id: "P1".to_string(),
        });
        let received = rx.recv().await.unwrap();
        match received {
            ProgressEvent::AgentUpdate { agent_id, .. } => assert_eq!(agent_id, "ingestor"),
            _ => panic!("expected AgentUpdate"),
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let bus = ProgressBus::new(16);
        bus.publish(ProgressEvent::AnalysisComplete {
            patient_id: "P1".to_string(),
            summary: serde_json::json!({}),
        });
    }
}
