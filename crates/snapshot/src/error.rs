use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Failures that stop a snapshot walk. Per-entry problems never surface here.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot root does not exist: {0}")]
    RootMissing(PathBuf),

    #[error("Snapshot root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Cannot read snapshot root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
