//! # ctx client
//!
//! Snapshots a codebase, opens a session with a ctx server and prints the
//! patches it proposes for a task.
//!
//! ```text
//! root ──> ctx_snapshot ──> CodebaseContext
//!                                 │
//!                 WsTransport <── Session ──> LOAD · prompt · SELECT · WORK…
//!                                 │
//!                                 └──> RunSummary (stdout) + <out-dir>/*.patch
//! ```

use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use ctx_protocol::{CloseReason, DirectoryFiles, Session, SessionConfig, WorkFailurePolicy};
use ctx_snapshot::SnapshotConfig;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

mod output;
mod run;
mod ws;

pub use output::{write_patches, FailedFile, RunSummary};
pub use run::{build_context, run_session, PromptSource};
pub use ws::{data_url, WsTransport};

#[derive(Parser)]
#[command(name = "ctx")]
#[command(about = "Ask a ctx server for patches against the current codebase", long_about = None)]
#[command(version)]
struct Cli {
    /// Server address (host:port or ws:// URL)
    #[arg(long, default_value = "localhost:8000")]
    addr: String,

    /// Codebase root (defaults to the current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Task prompt; read from stdin when omitted
    #[arg(short, long)]
    prompt: Option<String>,

    /// Client identifier sent with every request
    #[arg(long)]
    client_id: Option<String>,

    /// Ignore file name looked up in the root
    #[arg(long, default_value = ".ctxignore")]
    ignore_file: String,

    /// Do not apply the built-in exclude list
    #[arg(long)]
    no_default_excludes: bool,

    /// Write each patch under this directory
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Stop at the first rejected WORK reply
    #[arg(long)]
    abort_on_work_failure: bool,

    /// Seconds to wait for each server reply
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long)]
    quiet: bool,
}

fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().filter_or("CTX_LOG", "info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to resolve the current directory")?,
    };
    let root = root.canonicalize().unwrap_or(root);

    let snapshot_config = SnapshotConfig {
        ignore_file_name: cli.ignore_file,
        use_default_excludes: !cli.no_default_excludes,
        ..SnapshotConfig::default()
    };
    snapshot_config
        .validate()
        .map_err(|msg| anyhow::anyhow!("Invalid snapshot configuration: {msg}"))?;

    let (context, _) = build_context(root.clone(), snapshot_config).await?;

    let client_id = cli
        .client_id
        .unwrap_or_else(|| format!("ctx-{}", std::process::id()));
    let mut session_config = SessionConfig::new(client_id);
    if let Some(secs) = cli.timeout_secs {
        session_config = session_config.with_response_timeout(Duration::from_secs(secs));
    }
    if cli.abort_on_work_failure {
        session_config = session_config.with_work_failure_policy(WorkFailurePolicy::Abort);
    }

    let transport = WsTransport::connect(&data_url(&cli.addr)).await?;
    let mut session = Session::new(session_config, transport, context, DirectoryFiles::new(&root));

    let prompt = cli.prompt.map_or(PromptSource::Stdin, PromptSource::Given);
    let outcome = tokio::select! {
        result = run_session(&mut session, prompt) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let report = match outcome {
        Some(result) => {
            if let Err(e) = session.close(CloseReason::Normal).await {
                log::debug!("Close after run: {}", e);
            }
            result?
        }
        None => {
            log::info!("Interrupted, closing the session");
            session.close(CloseReason::Normal).await?;
            return Ok(());
        }
    };

    let summary = RunSummary::from_report(&report);
    if let Some(out_dir) = &cli.out_dir {
        let written = write_patches(out_dir, &summary.patches)
            .with_context(|| format!("Failed to write patches to {}", out_dir.display()))?;
        log::info!("Wrote {} patches to {}", written.len(), out_dir.display());
    }
    print_stdout(&serde_json::to_string_pretty(&summary)?)?;
    Ok(())
}
