//! Thoraxis — real-time chest-pain clinical decision-support engine.
//!
//! Two entry points into the core logic:
//! - [`agents::Orchestrator::assess`] — the synchronous, full-record pipeline
//!   (specialty agents -> triage -> treatment plan), driving `POST /assess`.
//! - [`ingest::RealtimeIngestor::ingest`] — the streaming vitals pipeline
//!   (baseline update -> anomaly check -> LLM narrative -> alert), driving
//!   `POST /vitals`.
//!
//! Everything else (`health_twin`, `llm`, `alerts`, `store`) is a
//! collaborator passed into one of those two entry points; none of it is
//! reached for through a global (spec.md §9 REDESIGN FLAGS).

pub mod agents;
pub mod alerts;
pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod health_twin;
pub mod ingest;
pub mod llm;
pub mod store;
pub mod treatment;
pub mod triage_engine;
pub mod types;
