//! Request handlers (spec.md §6): `/assess`, `/vitals`, and the progress
//! WebSocket feed. Grounded on the teacher's `api::handlers` (a `Clone`
//! state struct extracted via `State<S>`) but returning the literal,
//! unwrapped JSON shapes spec.md §6 specifies rather than the teacher's
//! `data`/`meta` envelope.

use super::envelope;
use crate::agents::Orchestrator;
use crate::alerts::ProgressBus;
use crate::ingest::{IngestOutcome, RealtimeIngestor};
use crate::store::{AlertLog, InMemoryStore, Repository};
use crate::treatment::TreatmentPlanner;
use crate::triage_engine;
use crate::types::{PatientRecord, PatientRecordWire, VitalSample};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Collaborators shared across every handler. Owned here, not reached for
/// through a global (spec.md §9 REDESIGN FLAGS).
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub ingestor: Arc<RealtimeIngestor>,
    pub store: Arc<InMemoryStore>,
    pub progress: Arc<ProgressBus>,
    pub alert_log: Arc<AlertLog>,
}

#[derive(Debug, Deserialize)]
pub struct AssessRequest {
    pub patient: PatientRecordWire,
}

#[derive(Debug, Serialize)]
pub struct AssessResponse {
    pub assessment: AssessmentView,
    pub triage: crate::types::TriageScore,
    pub treatment_plan: crate::types::TreatmentPlan,
}

#[derive(Debug, Serialize)]
pub struct AssessmentView {
    pub primary: crate::types::DiagnosisResult,
    pub agent_results: Vec<crate::types::DiagnosisResult>,
    pub safety_alerts: Vec<String>,
}

/// `POST /assess` — the synchronous full-record pipeline (spec.md §4.1-§4.6).
pub async fn assess(State(state): State<AppState>, Json(req): Json<AssessRequest>) -> Response {
    let record: PatientRecord = match req.patient.try_into() {
        Ok(record) => record,
        Err(err) => return envelope::bad_request(err.to_string()),
    };

    let assessment = state.orchestrator.assess(record.clone()).await;
    let triage = triage_engine::triage(&record, Some(assessment.primary()));
    let treatment_plan = TreatmentPlanner::plan(assessment.primary(), &record);

    state.store.put_patient(record);
    state.store.put_triage(&assessment.record.patient_id, triage.clone());
    let primary = assessment.primary().clone();
    let agent_results = assessment.agent_results.clone();
    let safety_alerts = assessment.safety_alerts.clone();
    state.store.put_assessment(assessment);

    Json(AssessResponse {
        assessment: AssessmentView { primary, agent_results, safety_alerts },
        triage,
        treatment_plan,
    })
    .into_response()
}

/// `POST /vitals` — the streaming ingest pipeline (spec.md §4.8).
pub async fn vitals(State(state): State<AppState>, Json(sample): Json<VitalSample>) -> Response {
    match state.ingestor.ingest(sample).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => envelope::bad_request(err.to_string()),
    }
}

/// `GET /alerts/{patient_id}` — recently delivered alerts for a patient.
/// Not itself in spec.md §6's worked examples, but needed to read back
/// what `AlertLog` accumulates; same unwrapped-array convention as the
/// rest of the API.
pub async fn recent_alerts(State(state): State<AppState>, axum::extract::Path(patient_id): axum::extract::Path<String>) -> Json<Vec<crate::types::Alert>> {
    Json(state.alert_log.recent(&patient_id))
}

/// `GET /ws` — progress feed (spec.md §6). No direct teacher precedent for
/// a fan-out WebSocket (the teacher only ever pushes over stdout-style
/// channels); authored from the standard axum websocket-upgrade pattern.
pub async fn progress_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| forward_progress(socket, state.progress.subscribe()))
}

async fn forward_progress(mut socket: WebSocket, mut rx: tokio::sync::broadcast::Receiver<crate::alerts::ProgressEvent>) {
    loop {
        tokio::select! {
            event = rx.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };
                let Ok(text) = serde_json::to_string(&event) else { continue };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}
