//! # ctx server
//!
//! Websocket endpoint answering LOAD, SELECT and WORK requests with model
//! output checked against each stage's response schema.
//!
//! ```text
//! /data ──> SocketTransport ──> StageHandler ──> ModelBackend (Gemini | stub)
//!                                   │
//!                                   └──> StagePayload validation ──> reply
//! ```

use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

mod backend;
mod config;
mod connection;
mod dump;
mod gemini;
mod handler;
mod stub;
mod ws;

pub use backend::{GenerateOptions, ModelBackend, ModelError};
pub use config::{ServerConfig, DEFAULT_ADDR, DEFAULT_TEMPERATURE};
pub use connection::serve_connection;
pub use dump::spawn_context_dump;
pub use gemini::{resolve_api_key, GeminiBackend, API_KEY_ENV, DEFAULT_MODEL};
pub use handler::{HandlerAction, StageHandler};
pub use stub::StubBackend;
pub use ws::{router, AppState, SocketTransport};

#[derive(Parser)]
#[command(name = "ctx-server")]
#[command(about = "Staged codebase context server", long_about = None)]
#[command(version)]
struct Cli {
    /// Listen address
    #[arg(long, default_value = DEFAULT_ADDR)]
    addr: String,

    /// Model id
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Sampling temperature
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f64,

    /// API key (falls back to GCP_AI_API_KEY, then ~/.secrets/GCP_AI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Answer with canned replies instead of calling a model
    #[arg(long)]
    stub: bool,

    /// Write each LOAD context to this file
    #[arg(long)]
    dump_context: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long)]
    quiet: bool,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().filter_or("CTX_LOG", "info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = ServerConfig {
        addr: cli.addr,
        model: cli.model,
        temperature: cli.temperature,
        dump_path: cli.dump_context,
    };
    config
        .validate()
        .map_err(|msg| anyhow::anyhow!("Invalid configuration: {msg}"))?;

    let backend: Arc<dyn ModelBackend> = if cli.stub {
        log::info!("Using stub model backend");
        Arc::new(StubBackend::new())
    } else {
        let key = resolve_api_key(cli.api_key.as_deref())?;
        Arc::new(GeminiBackend::new(config.model.clone(), key))
    };

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    let local_addr = listener.local_addr()?;
    log::info!(
        "Serving sessions on ws://{local_addr}/data with model {}",
        backend.name()
    );

    let app = router(AppState::new(backend, config));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
