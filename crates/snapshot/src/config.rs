/// Snapshot settings
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Ignore file looked up at the snapshot root
    pub ignore_file_name: String,

    /// Merge the built-in exclude list with the ignore file
    pub use_default_excludes: bool,

    /// Patterns added on top of the ignore file
    pub extra_patterns: Vec<String>,

    /// Files larger than this are listed without identifiers
    pub max_file_bytes: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            ignore_file_name: ".ctxignore".to_string(),
            use_default_excludes: true,
            extra_patterns: Vec::new(),
            max_file_bytes: 1024 * 1024,
        }
    }
}

impl SnapshotConfig {
    /// Only the ignore file, no built-in excludes
    pub fn ignore_file_only() -> Self {
        Self {
            use_default_excludes: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.ignore_file_name.trim().is_empty() {
            return Err("ignore_file_name must not be empty".to_string());
        }
        if self.ignore_file_name.contains(['/', '\\']) {
            return Err("ignore_file_name must be a bare file name".to_string());
        }
        if self.max_file_bytes == 0 {
            return Err("max_file_bytes must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(SnapshotConfig::default().validate().is_ok());
        assert!(!SnapshotConfig::ignore_file_only().use_default_excludes);
    }

    #[test]
    fn test_invalid_config() {
        let config = SnapshotConfig {
            max_file_bytes: 0,
            ..SnapshotConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SnapshotConfig {
            ignore_file_name: "nested/.ctxignore".into(),
            ..SnapshotConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
