use std::path::Path;

/// Entries skipped by default (matched by exact path component)
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    ".DS_Store",
    "__MACOSX",
    "node_modules",
    "dist",
    "__pycache__",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    "Debug",
    "Release",
    ".vs",
    ".vscode",
    ".idea",
    "cmake-build-debug",
    "target",
    ".gradle",
    ".classpath",
    ".project",
    ".bundle",
    "vendor/bundle",
    "bin",
    "docker-compose.override.yml",
    ".dockerignore",
    ".env",
    "logs",
    "coverage",
];

/// Ignore patterns loaded from a newline-delimited file.
///
/// A path is excluded when its base name glob-matches a pattern or when the
/// root-relative path starts with a pattern. This is deliberately looser than
/// `.gitignore` semantics.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    patterns: Vec<String>,
    globs: Vec<Option<glob::Pattern>>,
    builtin: bool,
}

impl IgnoreList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load patterns from `path`. A missing or unreadable file yields an
    /// empty list.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let list = Self::parse(&text);
                log::debug!("Loaded {} ignore patterns from {}", list.len(), path.display());
                list
            }
            Err(e) => {
                log::warn!("Failed to load ignore file {}: {e}", path.display());
                Self::new()
            }
        }
    }

    /// Blank lines and `#` comments are skipped, duplicates collapsed
    pub fn parse(text: &str) -> Self {
        Self::with_patterns(text.lines())
    }

    pub fn with_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        list.extend(patterns);
        list
    }

    pub fn extend<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in patterns {
            let pattern = raw.as_ref().trim();
            if pattern.is_empty() || pattern.starts_with('#') {
                continue;
            }
            if self.patterns.iter().any(|p| p == pattern) {
                continue;
            }
            let compiled = match glob::Pattern::new(pattern) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    // still usable as a literal prefix
                    log::debug!("Ignore pattern {pattern:?} is not a valid glob: {e}");
                    None
                }
            };
            self.patterns.push(pattern.to_string());
            self.globs.push(compiled);
        }
    }

    /// Also skip [`DEFAULT_EXCLUDES`]
    pub fn with_default_excludes(mut self) -> Self {
        self.builtin = true;
        self
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && !self.builtin
    }

    /// Check a root-relative path
    pub fn matches(&self, rel_path: &str) -> bool {
        let rel_path = normalize(rel_path);
        let base = rel_path.rsplit('/').next().unwrap_or(&rel_path);

        let user_match = self.patterns.iter().zip(&self.globs).any(|(pattern, compiled)| {
            compiled.as_ref().is_some_and(|g| g.matches(base)) || rel_path.starts_with(pattern.as_str())
        });

        user_match || (self.builtin && is_default_excluded(&rel_path))
    }
}

/// Stateless form of [`IgnoreList::matches`] over raw patterns
pub fn should_ignore(rel_path: &str, patterns: &[String]) -> bool {
    IgnoreList::with_patterns(patterns).matches(rel_path)
}

fn normalize(rel_path: &str) -> String {
    let mut value = rel_path.replace('\\', "/");
    while let Some(rest) = value.strip_prefix("./") {
        value = rest.to_string();
    }
    value
}

fn is_default_excluded(rel_path: &str) -> bool {
    DEFAULT_EXCLUDES.iter().any(|entry| {
        if entry.contains('/') {
            rel_path == *entry
                || rel_path
                    .strip_prefix(entry)
                    .is_some_and(|rest| rest.starts_with('/'))
        } else {
            rel_path.split('/').any(|component| component == *entry)
        }
    })
}
