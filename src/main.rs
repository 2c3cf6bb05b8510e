//! thoraxis-server — chest-pain decision-support HTTP service.
//!
//! # Usage
//!
//! ```bash
//! thoraxis-server --addr 0.0.0.0:8080
//! ```
//!
//! # Environment Variables
//!
//! - `THORAXIS_CONFIG`: path to a TOML config file (see `thoraxis::config`)
//! - `LLM_MODEL`: overrides the configured LLM model name
//! - `RUST_LOG`: tracing filter (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use thoraxis::agents::Orchestrator;
use thoraxis::alerts::{LoggingAlertSink, ProgressBus};
use thoraxis::api::{create_app, AppState};
use thoraxis::config::{self, AppConfig};
use thoraxis::health_twin::HealthTwin;
use thoraxis::ingest::RealtimeIngestor;
use thoraxis::store::{AlertLog, InMemoryStore};

#[cfg(feature = "http-llm")]
use thoraxis::llm::HttpLLMBackend;
use thoraxis::llm::{LLMBackend, MockBackend};

#[derive(Parser, Debug)]
#[command(name = "thoraxis-server")]
#[command(about = "Real-time chest-pain clinical decision-support engine")]
#[command(version)]
struct CliArgs {
    /// Override the configured server bind address.
    #[arg(short, long)]
    addr: Option<String>,

    /// LLM backend endpoint (enables the HTTP backend when set).
    #[arg(long, env = "LLM_ENDPOINT")]
    llm_endpoint: Option<String>,

    /// API key for the LLM endpoint.
    #[arg(long, env = "LLM_API_KEY")]
    llm_api_key: Option<String>,
}

fn build_llm_backend(args: &CliArgs, cfg: &AppConfig) -> Arc<dyn LLMBackend> {
    #[cfg(feature = "http-llm")]
    if let (Some(endpoint), Some(api_key)) = (&args.llm_endpoint, &args.llm_api_key) {
        info!(endpoint = %endpoint, model = %cfg.llm_model, "using HTTP LLM backend");
        return Arc::new(HttpLLMBackend::new(endpoint.clone(), api_key.clone(), cfg.llm_model.clone(), cfg.llm_deadline()));
    }
    let _ = (args, cfg);
    info!("no LLM endpoint configured, using deterministic mock backend");
    Arc::new(MockBackend)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();

    let args = CliArgs::parse();

    config::init(AppConfig::load());
    let cfg = config::get();
    let server_addr = args.addr.clone().unwrap_or_else(|| cfg.server_addr.clone());

    info!("thoraxis-server starting");

    let health_twin = Arc::new(HealthTwin::new());
    let llm = build_llm_backend(&args, cfg);
    let alert_sink = Arc::new(LoggingAlertSink::new());
    let progress = Arc::new(ProgressBus::default());
    let alert_log = Arc::new(AlertLog::default());

    let ingestor = Arc::new(RealtimeIngestor::new(Arc::clone(&health_twin), llm, alert_sink, Arc::clone(&progress)));
    let orchestrator = Arc::new(Orchestrator::with_default_registry());
    let store = Arc::new(InMemoryStore::new());

    let state = AppState { orchestrator, ingestor, store, progress, alert_log };
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("failed to bind to {server_addr}"))?;
    info!(addr = %server_addr, "listening");

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        shutdown_token.cancel();
    });

    // JoinSet supervisor: a single task today, but the shape leaves room
    // for a future background task (e.g. a baseline-decay sweeper) without
    // restructuring main.
    let mut tasks: JoinSet<Result<()>> = JoinSet::new();
    let http_cancel = cancel_token.clone();
    tasks.spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                http_cancel.cancelled().await;
            })
            .await
            .context("HTTP server error")
    });

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => info!("task completed"),
            Ok(Err(e)) => error!(error = %e, "task failed"),
            Err(e) => error!(error = %e, "task panicked"),
        }
    }

    info!("thoraxis-server shutdown complete");
    Ok(())
}
