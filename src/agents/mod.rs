//! Specialty agents: the `SpecialtyAgent` contract, one shared
//! hypothesize → entropy → recurse → synthesize skeleton (spec.md §4.2),
//! and the five concrete scorers (spec.md §4.3).
//!
//! Grounded on the teacher's `Specialist` trait
//! (`examples/ashton-dyke-SAIREN-OS/src/agents/specialists/mod.rs`) plus the
//! shared-skeleton-over-variant-behavior shape of `Orchestrator::vote`.

pub mod cardiology;
pub mod gastro;
pub mod msk;
pub mod orchestrator;
pub mod pulmonary;
pub mod safety;

pub use orchestrator::Orchestrator;

use crate::config;
use crate::features::ClinicalFeatures;
use crate::types::{DiagnosisResult, PatientRecord, RiskLevel, SpecialtyTag};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Default per-kind emission floor (spec.md §4.3).
pub const EMISSION_FLOOR: f64 = 0.3;
/// Pleuritis alone uses a lower floor (spec.md §4.3).
pub const PLEURITIS_EMISSION_FLOOR: f64 = 0.25;

/// A specialty's scoring capability (spec.md §4.2/§4.3).
///
/// Implementors supply only `hypothesize` and, where applicable,
/// `identify_subspecialties`/`run_subagent`/`pick_hypothesis`; the shared
/// recursion and synthesis skeleton lives in [`run_specialty_agent`].
pub trait SpecialtyAgent: Send + Sync {
    fn tag(&self) -> SpecialtyTag;
    fn name(&self) -> &'static str;

    /// Produce the specialty's ranked hypotheses for this record. Pure:
    /// no I/O, deterministic for identical input (spec.md P6).
    fn hypothesize(&self, record: &PatientRecord, features: &ClinicalFeatures) -> Vec<DiagnosisResult>;

    /// Whether this agent ever recurses. SafetyAgent never does (spec.md §4.3.1).
    fn allows_recursion(&self) -> bool {
        true
    }

    /// Risk level of the generic fallback when no hypothesis clears the
    /// emission floor (spec.md §4.2 step 4: "MODERATE for Safety, LOW elsewhere").
    fn fallback_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    /// Deterministic subspecialty tag derivation from the top hypotheses
    /// (spec.md §4.2 step 3, resolved per SPEC_FULL.md §4.2 / DESIGN.md OQ-1).
    /// The default implementation never recurses.
    fn identify_subspecialties(&self, _hypotheses: &[DiagnosisResult]) -> Vec<String> {
        Vec::new()
    }

    /// Run the child agent for a given subspecialty tag at `depth`. Only
    /// CardiologyAgent overrides this (the ACS/HEART-score sub-agent,
    /// spec.md §4.3.2).
    fn run_subagent(
        &self,
        _tag: &str,
        _record: &PatientRecord,
        _features: &ClinicalFeatures,
        _depth: u8,
    ) -> Option<DiagnosisResult> {
        None
    }

    /// Choose among this specialty's own hypotheses (not children). Default
    /// is highest confidence; PulmonaryAgent overrides this for the PE
    /// tie-break (spec.md §4.3.6).
    fn pick_hypothesis(&self, hypotheses: &[DiagnosisResult]) -> DiagnosisResult {
        pick_highest_confidence(hypotheses)
    }
}

/// Highest-confidence entry in a non-empty slice. Ties keep the first
/// (registration order), matching the orchestrator's stable-sort tie rule
/// (spec.md §5 "ties resolve by agent registration order").
pub fn pick_highest_confidence(hypotheses: &[DiagnosisResult]) -> DiagnosisResult {
    let mut best = hypotheses
        .first()
        .cloned()
        .expect("pick_highest_confidence called with an empty hypothesis list");
    for h in &hypotheses[1..] {
        if h.confidence > best.confidence {
            best = h.clone();
        }
    }
    best
}

/// Normalize confidences to a probability distribution and compute the
/// Shannon entropy, normalized by `log2(N)` (spec.md §4.2 step 2).
/// `N <= 1` or a zero total yields maximal uncertainty (1.0).
pub fn normalized_entropy(confidences: &[f64]) -> f64 {
    let n = confidences.len();
    if n <= 1 {
        return 1.0;
    }
    let sum: f64 = confidences.iter().sum();
    if sum <= 0.0 {
        return 1.0;
    }
    let h: f64 = -confidences
        .iter()
        .map(|c| c / sum)
        .filter(|p| *p > 0.0)
        .map(|p| p * p.log2())
        .sum::<f64>();
    let max_h = (n as f64).log2();
    if max_h <= 0.0 {
        1.0
    } else {
        h / max_h
    }
}

/// Run one specialty end to end: hypothesize, measure entropy, conditionally
/// recurse, synthesize (spec.md §4.2). Boxed because the recursive call
/// through `run_subagent` needs a non-self-referential future.
///
/// Grounded on the teacher's `Orchestrator::vote` shape: a shared skeleton
/// invoking variant-specific behavior, generalized here to also cover the
/// teacher's `main.rs` "JoinSet Supervisor Pattern" for the recursive
/// sub-agent fan-out in step 3.
pub fn run_specialty_agent(
    agent: Arc<dyn SpecialtyAgent>,
    record: Arc<PatientRecord>,
    features: Arc<ClinicalFeatures>,
    depth: u8,
) -> BoxFuture<'static, DiagnosisResult> {
    Box::pin(async move {
        let hypotheses = agent.hypothesize(&record, &features);

        if hypotheses.is_empty() {
            return DiagnosisResult::fallback(
                agent.name(),
                depth,
                agent.fallback_risk(),
                "no clinical indicator met the emission threshold for this specialty",
            );
        }

        let cfg = config::get();
        let confidences: Vec<f64> = hypotheses.iter().map(|h| h.confidence).collect();
        let uncertainty = normalized_entropy(&confidences);
        let recursion_threshold = 1.0 - cfg.confidence_threshold;

        let mut children: Vec<DiagnosisResult> = Vec::new();
        if agent.allows_recursion() && uncertainty > recursion_threshold && depth < cfg.max_depth {
            let tags = agent.identify_subspecialties(&hypotheses);
            if !tags.is_empty() {
                let mut set: JoinSet<Option<DiagnosisResult>> = JoinSet::new();
                for tag in tags {
                    let agent = Arc::clone(&agent);
                    let record = Arc::clone(&record);
                    let features = Arc::clone(&features);
                    set.spawn(async move { agent.run_subagent(&tag, &record, &features, depth + 1) });
                }
                while let Some(joined) = set.join_next().await {
                    // A panicking sub-agent contributes no child; the parent
                    // still synthesizes from its own hypotheses.
                    if let Ok(Some(child)) = joined {
                        children.push(child);
                    }
                }
            }
        }

        let best_child = children
            .iter()
            .filter(|c| c.confidence > 0.8)
            .fold(None::<&DiagnosisResult>, |acc, c| match acc {
                Some(a) if a.confidence >= c.confidence => Some(a),
                _ => Some(c),
            })
            .cloned();

        let mut chosen = best_child.unwrap_or_else(|| agent.pick_hypothesis(&hypotheses));
        chosen.depth = depth;
        chosen.children = children;
        chosen.clamp_confidence()
    })
}

/// The five specialties, in the registration order the orchestrator uses
/// for deterministic tie-breaking (spec.md §5).
pub fn registry() -> Vec<Arc<dyn SpecialtyAgent>> {
    vec![
        Arc::new(safety::SafetyAgent),
        Arc::new(cardiology::CardiologyAgent),
        Arc::new(gastro::GastroAgent),
        Arc::new(msk::MskAgent),
        Arc::new(pulmonary::PulmonaryAgent),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entropy_is_maximal_for_single_hypothesis() {
        assert_eq!(normalized_entropy(&[0.9]), 1.0);
    }

    #[test]
    fn entropy_is_maximal_for_zero_confidence() {
        assert_eq!(normalized_entropy(&[0.0, 0.0]), 1.0);
    }

    #[test]
    fn entropy_is_zero_for_a_single_dominant_hypothesis() {
        // One hypothesis carries essentially all mass -> near-zero entropy.
        let h = normalized_entropy(&[0.999, 0.0005, 0.0005]);
        assert!(h < 0.05, "expected near-zero entropy, got {h}");
    }

    #[test]
    fn entropy_is_one_for_uniform_hypotheses() {
        let h = normalized_entropy(&[0.5, 0.5, 0.5, 0.5]);
        assert!((h - 1.0).abs() < 1e-9);
    }
}
