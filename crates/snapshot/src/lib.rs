//! # ctx snapshot
//!
//! Builds the codebase snapshot sent with the LOAD stage.
//!
//! ```text
//! root/
//!     │
//!     ├──> Ignore list (.ctxignore + built-in excludes)
//!     │
//!     ├──> Pre-order walk
//!     │    ├─> excluded entry → marker node, directory not descended
//!     │    ├─> directory      → node with children
//!     │    └─> file           → identifier set (empty when unsupported)
//!     │
//!     └──> SnapshotNode tree + notes + stats
//! ```

mod builder;
mod config;
mod error;
mod ignore_list;
mod stats;

pub use builder::{load_snapshot_context, Snapshot, SnapshotBuilder, EXCLUDED_NOTE};
pub use config::SnapshotConfig;
pub use error::{Result, SnapshotError};
pub use ignore_list::{should_ignore, IgnoreList, DEFAULT_EXCLUDES};
pub use stats::SnapshotStats;
