//! Process-wide configuration.
//!
//! Provides the operator-tunable knobs that are *not* part of the normative
//! clinical scoring weights (those live as `const` data beside each agent so
//! that identical inputs always yield identical confidences — see
//! `crate::agents`). Everything here is safe to vary between deployments:
//! server bind address, recursion limits, ring-buffer sizes, LLM deadlines.
//!
//! ## Loading order
//!
//! 1. `THORAXIS_CONFIG` environment variable (path to a TOML file)
//! 2. `thoraxis.toml` in the current working directory
//! 3. Built-in defaults (`defaults` module)
//!
//! ## Usage
//!
//! Call [`init`] once at startup, then [`get`] anywhere:
//!
//! ```ignore
//! config::init(AppConfig::load());
//! let depth = config::get().max_depth;
//! ```

pub mod defaults;

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

/// Process-wide application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server bind address.
    pub server_addr: String,

    /// Maximum recursion depth for specialty sub-agent spawning (spec.md §4.2).
    pub max_depth: u8,

    /// Uncertainty threshold above which an agent recurses (spec.md §4.2).
    pub confidence_threshold: f64,

    /// Per-patient vital-sample ring buffer capacity (spec.md §3).
    pub ring_buffer_size: usize,

    /// Deadline for a single `LLMBackend::analyze_medical_vitals` call (spec.md §5).
    pub llm_deadline_secs: u64,

    /// Name of the LLM model the backend should request (env `LLM_MODEL` overrides this).
    pub llm_model: String,

    /// How often (in samples) a baseline's p5/p95 reservoir is recomputed (spec.md §4.7).
    pub baseline_recompute_every: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_addr: defaults::DEFAULT_SERVER_ADDR.to_string(),
            max_depth: defaults::DEFAULT_MAX_DEPTH,
            confidence_threshold: defaults::DEFAULT_CONFIDENCE_THRESHOLD,
            ring_buffer_size: defaults::DEFAULT_RING_BUFFER_SIZE,
            llm_deadline_secs: defaults::DEFAULT_LLM_DEADLINE_SECS,
            llm_model: "default".to_string(),
            baseline_recompute_every: defaults::DEFAULT_BASELINE_RECOMPUTE_EVERY,
        }
    }
}

impl AppConfig {
    /// Load configuration following the precedence order documented above.
    ///
    /// Never fails: a missing or unreadable TOML file falls back to defaults
    /// with a warning, since a bad config file is an operator mistake, not a
    /// reason to refuse to start.
    pub fn load() -> Self {
        let path = std::env::var("THORAXIS_CONFIG").unwrap_or_else(|_| "thoraxis.toml".to_string());
        let mut cfg = match std::fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str::<AppConfig>(&raw) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "loaded configuration file");
                    cfg
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "failed to parse config file, using defaults");
                    AppConfig::default()
                }
            },
            Err(_) => AppConfig::default(),
        };

        if let Ok(model) = std::env::var("LLM_MODEL") {
            cfg.llm_model = model;
        }

        cfg
    }

    pub fn llm_deadline(&self) -> Duration {
        Duration::from_secs(self.llm_deadline_secs)
    }
}

/// Global configuration, initialized once at startup.
static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Initialize the global configuration.
///
/// Must be called exactly once before any call to [`get`].
pub fn init(config: AppConfig) {
    if APP_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global configuration.
///
/// Panics if `init()` has not been called. This is by design — a missing
/// config is a startup bug, not a recoverable condition.
pub fn get() -> &'static AppConfig {
    APP_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

/// Check whether the config has been initialized. Useful for tests.
pub fn is_initialized() -> bool {
    APP_CONFIG.get().is_some()
}

/// Initialize with defaults if not already initialized. Test convenience.
pub fn ensure_test_config() {
    if !is_initialized() {
        init(AppConfig::default());
    }
}
