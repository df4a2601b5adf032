use anyhow::{Context as AnyhowContext, Result};
use ctx_protocol::{CodebaseContext, FileSource, Session, SessionReport, Transport};
use ctx_snapshot::{load_snapshot_context, SnapshotConfig, SnapshotStats};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Where the task prompt comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSource {
    Given(String),
    /// Ask on the terminal once LOAD has been sent
    Stdin,
}

impl PromptSource {
    async fn resolve(self) -> Result<String> {
        let prompt = match self {
            PromptSource::Given(prompt) => prompt,
            PromptSource::Stdin => read_prompt().await?,
        };
        let prompt = prompt.trim().to_string();
        if prompt.is_empty() {
            anyhow::bail!("Task prompt is empty");
        }
        Ok(prompt)
    }
}

async fn read_prompt() -> Result<String> {
    let mut stderr = tokio::io::stderr();
    stderr.write_all(b"Enter text: ").await?;
    stderr.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read the task prompt")?;
    Ok(line)
}

/// Snapshot `root` off the async runtime
pub async fn build_context(
    root: PathBuf,
    config: SnapshotConfig,
) -> Result<(CodebaseContext, SnapshotStats)> {
    let display = root.display().to_string();
    let (context, stats) = tokio::task::spawn_blocking(move || load_snapshot_context(&root, config))
        .await
        .context("Snapshot task panicked")?
        .with_context(|| format!("Failed to snapshot {display}"))?;
    log::info!(
        "Snapshot of {}: {} files, {} directories, {} excluded, {} identifiers in {}ms",
        display,
        stats.files,
        stats.directories,
        stats.excluded,
        stats.identifiers,
        stats.time_ms
    );
    Ok((context, stats))
}

/// LOAD first, then the prompt, then SELECT and WORK for the plan
pub async fn run_session<T: Transport, F: FileSource>(
    session: &mut Session<T, F>,
    prompt: PromptSource,
) -> Result<SessionReport> {
    let load = session.load().await?;
    let task = prompt.resolve().await?;
    let plan = session.select(task).await?;
    let work = session.work_all().await?;
    Ok(SessionReport { load, plan, work })
}
