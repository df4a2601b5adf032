use serde::{Deserialize, Serialize};

/// Counters collected during one snapshot walk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStats {
    /// Included directories
    pub directories: usize,

    /// Included files
    pub files: usize,

    /// Entries matched by the ignore list
    pub excluded: usize,

    /// Identifiers summed over all files
    pub identifiers: usize,

    /// Files listed without identifiers because of their size
    pub oversized: usize,

    /// Entries that could not be read
    pub errors: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl SnapshotStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_directory(&mut self) {
        self.directories += 1;
    }

    pub fn add_file(&mut self, identifiers: usize) {
        self.files += 1;
        self.identifiers += identifiers;
    }

    pub fn add_excluded(&mut self) {
        self.excluded += 1;
    }

    pub fn add_oversized(&mut self) {
        self.oversized += 1;
    }

    pub fn add_error(&mut self) {
        self.errors += 1;
    }
}
