//! Built-in defaults for every operator-tunable setting.
//!
//! These mirror the numeric defaults named in the specification (confidence
//! threshold 0.85, max recursion depth 3, ring buffer size 300, LLM deadline
//! 10s) so that `AppConfig::default()` alone is enough to run the pipeline
//! with spec-compliant behavior.

pub const DEFAULT_MAX_DEPTH: u8 = 3;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.85;
pub const DEFAULT_EMISSION_FLOOR: f64 = 0.3;
pub const DEFAULT_PLEURITIS_EMISSION_FLOOR: f64 = 0.25;
pub const DEFAULT_RING_BUFFER_SIZE: usize = 300;
pub const DEFAULT_LLM_DEADLINE_SECS: u64 = 10;
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_BASELINE_RECOMPUTE_EVERY: usize = 100;
