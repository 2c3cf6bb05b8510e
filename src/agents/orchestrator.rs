//! Orchestrator — fans out the specialty registry, collects results under
//! per-agent failure isolation, and consolidates a primary diagnosis
//! (spec.md §4.4).
//!
//! Grounded on the teacher's `main.rs` "JoinSet Supervisor Pattern": spawn N
//! tasks, collect outcomes including errors, join before returning.

use super::SpecialtyAgent;
use crate::error::AgentError;
use crate::features::FeatureExtractor;
use crate::types::{AssessmentState, DiagnosisResult, PatientRecord, RiskLevel};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::{Id, JoinSet};

pub struct Orchestrator {
    agents: Vec<Arc<dyn SpecialtyAgent>>,
}

impl Orchestrator {
    pub fn new(agents: Vec<Arc<dyn SpecialtyAgent>>) -> Self {
        Self { agents }
    }

    /// All five specialties — "intentional comprehensive sweep" (spec.md §4.4).
    pub fn with_default_registry() -> Self {
        Self::new(super::registry())
    }

    /// Run every registered specialty concurrently and consolidate a primary
    /// diagnosis. Never fails: a misbehaving agent is dropped with an
    /// `AGENT_ERROR:<agent>` entry in `safety_alerts` (spec.md §4.4/§7).
    pub async fn assess(&self, record: PatientRecord) -> AssessmentState {
        let record = Arc::new(record);
        let features = Arc::new(FeatureExtractor::extract(&record));

        let mut set: JoinSet<DiagnosisResult> = JoinSet::new();
        // JoinSet::join_next yields completion order, not spawn order (tasks
        // run on a real multi-thread runtime) — slots here are indexed by
        // registration order so a later stable-sort tie-break in
        // `select_primary` still resolves by `registry()` order (spec.md §5).
        let mut names: HashMap<Id, (usize, String)> = HashMap::new();
        let mut slots: Vec<Option<DiagnosisResult>> = (0..self.agents.len()).map(|_| None).collect();

        for (index, agent) in self.agents.iter().enumerate() {
            let agent = Arc::clone(agent);
            let record = Arc::clone(&record);
            let features = Arc::clone(&features);
            let label = agent.name().to_string();
            let handle = set.spawn(super::run_specialty_agent(agent, record, features, 0));
            names.insert(handle.id(), (index, label));
        }

        let mut safety_alerts = Vec::new();

        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((id, result)) => {
                    let index = names.get(&id).map(|(index, _)| *index).expect("joined task was spawned with a tracked id");
                    slots[index] = Some(result);
                }
                Err(join_err) => {
                    let agent_name = names.get(&join_err.id()).map(|(_, name)| name.clone()).unwrap_or_else(|| "unknown".to_string());
                    let err = AgentError::new(agent_name, join_err.to_string());
                    tracing::warn!(agent = %err.agent, reason = %err.reason, "specialty agent failed");
                    safety_alerts.push(err.alert_code());
                }
            }
        }

        let mut agent_results: Vec<DiagnosisResult> = slots.into_iter().flatten().collect();

        if agent_results.is_empty() {
            agent_results.push(DiagnosisResult::fallback(
                "orchestrator",
                0,
                RiskLevel::Low,
                "no specialty agent produced a result",
            ));
        }

        let primary_index = select_primary(&agent_results);
        AssessmentState::new(&record, agent_results, primary_index, safety_alerts)
    }
}

/// Consolidation per spec.md §4.4:
/// 1. Partition into life-threatening (CRITICAL/HIGH) vs non-emergent (MODERATE/LOW).
/// 2. If life-threatening is non-empty, stable-sort by (risk_priority desc, confidence desc); take the first.
/// 3. Else stable-sort non-emergent by confidence desc; take the first.
///
/// "Life-threatening never loses to non-emergent, regardless of confidence"
/// (spec.md P1) — the single most important contract in the system.
fn select_primary(agent_results: &[DiagnosisResult]) -> usize {
    let life_threat: Vec<usize> = (0..agent_results.len())
        .filter(|&i| agent_results[i].risk_level.is_life_threatening())
        .collect();

    if !life_threat.is_empty() {
        let mut idx = life_threat;
        idx.sort_by(|&a, &b| {
            agent_results[b]
                .risk_level
                .priority()
                .cmp(&agent_results[a].risk_level.priority())
                .then_with(|| {
                    agent_results[b]
                        .confidence
                        .partial_cmp(&agent_results[a].confidence)
                        .unwrap_or(Ordering::Equal)
                })
        });
        return idx[0];
    }

    let mut idx: Vec<usize> = (0..agent_results.len()).collect();
    idx.sort_by(|&a, &b| {
        agent_results[b]
            .confidence
            .partial_cmp(&agent_results[a].confidence)
            .unwrap_or(Ordering::Equal)
    });
    idx[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::features::ClinicalFeatures;
    use crate::types::{DiagnosisKind, PatientRecordWire, Sex, SpecialtyTag};
    use std::collections::{HashMap, HashSet};

    fn result(risk: RiskLevel, confidence: f64) -> DiagnosisResult {
        DiagnosisResult {
            diagnosis_kind: DiagnosisKind::Unknown,
            confidence,
            risk_level: risk,
            reasoning: String::new(),
            recommendations: vec![],
            supporting_evidence: Default::default(),
            agent_name: "test".to_string(),
            depth: 0,
            children: vec![],
        }
    }

    /// An agent that sleeps (blocking its worker thread) before returning a
    /// fixed, tied hypothesis — used to force out-of-registration-order
    /// `JoinSet` completion under a real multi-thread scheduler.
    struct DelayedAgent {
        label: &'static str,
        delay_ms: u64,
    }

    impl SpecialtyAgent for DelayedAgent {
        fn tag(&self) -> SpecialtyTag {
            SpecialtyTag::Safety
        }

        fn name(&self) -> &'static str {
            self.label
        }

        fn allows_recursion(&self) -> bool {
            false
        }

        fn hypothesize(&self, _record: &PatientRecord, _features: &ClinicalFeatures) -> Vec<DiagnosisResult> {
            std::thread::sleep(std::time::Duration::from_millis(self.delay_ms));
            vec![result(RiskLevel::High, 0.7)]
        }
    }

    fn minimal_record() -> PatientRecord {
        PatientRecord::try_from(PatientRecordWire {
            patient_id: "P1".to_string(),
            hadm_id: None,
            age: 50,
            sex: Sex::M,
            chief_complaint: String::new(),
            vitals: HashMap::new(),
            labs: HashMap::new(),
            icd_codes: HashSet::new(),
            admission_time: chrono::Utc::now(),
        })
        .unwrap()
    }

    /// spec.md §5: "agent results may arrive in any order; consolidation is
    /// deterministic ... ties resolve by agent registration order." Registers
    /// the slower agent first so a naive completion-order collection would
    /// put the faster, later-registered agent ahead of it.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn assess_preserves_registration_order_for_ties_regardless_of_completion_order() {
        config::ensure_test_config();
        let agents: Vec<Arc<dyn SpecialtyAgent>> = vec![
            Arc::new(DelayedAgent { label: "first", delay_ms: 40 }),
            Arc::new(DelayedAgent { label: "second", delay_ms: 0 }),
        ];
        let orchestrator = Orchestrator::new(agents);

        let assessment = orchestrator.assess(minimal_record()).await;

        assert_eq!(assessment.agent_results[0].agent_name, "first");
        assert_eq!(assessment.agent_results[1].agent_name, "second");
        assert_eq!(assessment.primary().agent_name, "first");
    }

    #[test]
    fn life_threat_never_loses_to_higher_confidence_non_emergent() {
        let results = vec![result(RiskLevel::Low, 0.95), result(RiskLevel::High, 0.4)];
        let idx = select_primary(&results);
        assert_eq!(results[idx].risk_level, RiskLevel::High);
    }

    #[test]
    fn critical_beats_high_regardless_of_confidence() {
        let results = vec![result(RiskLevel::High, 0.99), result(RiskLevel::Critical, 0.5)];
        let idx = select_primary(&results);
        assert_eq!(results[idx].risk_level, RiskLevel::Critical);
    }

    #[test]
    fn non_emergent_picks_highest_confidence() {
        let results = vec![result(RiskLevel::Low, 0.2), result(RiskLevel::Moderate, 0.6)];
        let idx = select_primary(&results);
        assert_eq!(idx, 1);
    }

    #[test]
    fn ties_resolve_by_registration_order() {
        let results = vec![result(RiskLevel::High, 0.7), result(RiskLevel::High, 0.7)];
        let idx = select_primary(&results);
        assert_eq!(idx, 0);
    }
}
