//! LLMBackend — narrative interpretation of streamed vitals (spec.md §4.8).
//!
//! Grounded on the teacher's `fleet::client::FleetClient` (reqwest client
//! shape, feature-gated, its own error enum) for the HTTP-backed
//! implementation, and on `llm::tactical_llm::TacticalLLM`'s
//! feature-gated-mock pattern for the deterministic fallback that ships
//! even when `http-llm` is disabled.

use crate::error::BackendUnavailable;
use crate::features::ClinicalFeatures;
use crate::types::{StreamRiskLevel, VitalSample};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Structured output of a vitals narrative pass (spec.md §4.8 step 3, §6).
/// `confidence` is `0..1`, matching the worked `/vitals` response example in
/// spec.md §6 rather than the `0..100` scale mentioned in the same section's
/// abstract backend-contract note (see DESIGN.md for this discrepancy).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalsInterpretation {
    pub diagnosis: String,
    pub confidence: f64,
    pub risk_level: StreamRiskLevel,
    pub rationale: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Any backend capable of turning a patient's current vitals into a
/// diagnostic narrative. Implementations must complete within the caller's
/// deadline; `Backend` is the only error variant callers should expect —
/// timeouts are applied by the caller (spec.md §5), not here.
#[async_trait]
pub trait LLMBackend: Send + Sync {
    async fn analyze_medical_vitals(
        &self,
        patient_id: &str,
        vitals: &VitalSample,
        features: &ClinicalFeatures,
    ) -> Result<VitalsInterpretation, BackendUnavailable>;

    /// General-purpose free-text analysis, used outside the streaming path
    /// (e.g. ad-hoc clinician queries). Not exercised by the ingest pipeline.
    async fn analyze(&self, prompt: &str) -> Result<String, BackendUnavailable>;
}

/// Deterministic rule used whenever no model is configured, or the model
/// call fails or times out (spec.md §4.8 step 4):
/// `severity > 0.30 -> NSTEMI-suspected, CRITICAL`, else `Unstable Angina, HIGH`.
pub fn deterministic_fallback(severity: f64) -> VitalsInterpretation {
    if severity > 0.30 {
        VitalsInterpretation {
            diagnosis: "NSTEMI-suspected".to_string(),
            confidence: severity,
            risk_level: StreamRiskLevel::Critical,
            rationale: format!("anomaly severity {severity:.2} exceeds the 0.30 deterministic threshold"),
            recommendations: vec!["Activate cath lab protocol".to_string(), "Serial troponins".to_string()],
        }
    } else {
        VitalsInterpretation {
            diagnosis: "Unstable Angina".to_string(),
            confidence: 1.0 - severity,
            risk_level: StreamRiskLevel::High,
            rationale: format!("anomaly severity {severity:.2} below the 0.30 deterministic threshold"),
            recommendations: vec!["Cardiology consult".to_string(), "Serial troponins".to_string()],
        }
    }
}

/// Mock backend: always falls through to [`deterministic_fallback`]. Used
/// in tests and whenever the `http-llm` feature is compiled out.
pub struct MockBackend;

#[async_trait]
impl LLMBackend for MockBackend {
    async fn analyze_medical_vitals(
        &self,
        _patient_id: &str,
        _vitals: &VitalSample,
        _features: &ClinicalFeatures,
    ) -> Result<VitalsInterpretation, BackendUnavailable> {
        Ok(deterministic_fallback(0.0))
    }

    async fn analyze(&self, prompt: &str) -> Result<String, BackendUnavailable> {
        Ok(format!("mock response to: {prompt}"))
    }
}

#[cfg(feature = "http-llm")]
pub mod http {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, serde::Serialize)]
    struct ChatRequest<'a> {
        model: &'a str,
        messages: Vec<ChatMessage<'a>>,
        temperature: f64,
    }

    #[derive(Debug, serde::Serialize)]
    struct ChatMessage<'a> {
        role: &'a str,
        content: String,
    }

    #[derive(Debug, Deserialize)]
    struct ChatResponse {
        choices: Vec<ChatChoice>,
    }

    #[derive(Debug, Deserialize)]
    struct ChatChoice {
        message: ChatMessageOwned,
    }

    #[derive(Debug, Deserialize)]
    struct ChatMessageOwned {
        content: String,
    }

    /// HTTP-backed `LLMBackend` speaking an OpenAI-compatible chat-completions
    /// protocol. Mirrors the teacher's `FleetClient`: a bearer-token `reqwest`
    /// client with its own error enum, built once and cloned cheaply.
    #[derive(Clone)]
    pub struct HttpLLMBackend {
        http: reqwest::Client,
        endpoint: String,
        api_key: String,
        model: String,
    }

    impl HttpLLMBackend {
        pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
            let http = reqwest::Client::builder().timeout(timeout).build().expect("failed to build LLM HTTP client");
            Self {
                http,
                endpoint: endpoint.into(),
                api_key: api_key.into(),
                model: model.into(),
            }
        }

        async fn complete(&self, system_prompt: &str, user_prompt: String) -> Result<String, BackendUnavailable> {
            let body = ChatRequest {
                model: &self.model,
                messages: vec![
                    ChatMessage { role: "system", content: system_prompt.to_string() },
                    ChatMessage { role: "user", content: user_prompt },
                ],
                temperature: 0.0,
            };

            let resp = self
                .http
                .post(&self.endpoint)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await
                .map_err(|e| BackendUnavailable::Transport(e.to_string()))?;

            if !resp.status().is_success() {
                return Err(BackendUnavailable::Transport(format!("status {}", resp.status())));
            }

            let parsed: ChatResponse = resp.json().await.map_err(|e| BackendUnavailable::MalformedResponse(e.to_string()))?;
            parsed
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| BackendUnavailable::MalformedResponse("empty choices array".to_string()))
        }
    }

    #[async_trait]
    impl LLMBackend for HttpLLMBackend {
        async fn analyze_medical_vitals(
            &self,
            patient_id: &str,
            vitals: &VitalSample,
            features: &ClinicalFeatures,
        ) -> Result<VitalsInterpretation, BackendUnavailable> {
            let user_prompt = format!(
                "Patient {patient_id}, age {}, chief complaint features: dyspnea={}, pleuritic={}, hypoxia={}. \
                 Latest vitals: HR={:?} SpO2={:?} RR={:?} BP={:?}/{:?}. \
                 Respond with a JSON object: {{\"diagnosis\": string, \"confidence\": 0..1, \"risk_level\": one of LOW/MODERATE/HIGH/CRITICAL, \"rationale\": string, \"recommendations\": [string]}}.",
                features.age,
                features.dyspnea,
                features.pleuritic,
                features.hypoxia,
                vitals.heart_rate,
                vitals.spo2,
                vitals.respiratory_rate,
                vitals.bp_sys,
                vitals.bp_dia,
            );
            let raw = self.complete("You are a cardiology triage assistant.", user_prompt).await?;
            serde_json::from_str(&raw).map_err(|e| BackendUnavailable::MalformedResponse(e.to_string()))
        }

        async fn analyze(&self, prompt: &str) -> Result<String, BackendUnavailable> {
            self.complete("You are a clinical decision-support assistant.", prompt.to_string()).await
        }
    }
}

#[cfg(feature = "http-llm")]
pub use http::HttpLLMBackend;
