use crate::config::SnapshotConfig;
use crate::error::{Result, SnapshotError};
use crate::ignore_list::IgnoreList;
use crate::stats::SnapshotStats;
use ctx_identifiers::{ExtractError, Extractors};
use ctx_protocol::{CodebaseContext, SnapshotNode};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Instant;
use walkdir::WalkDir;

pub const EXCLUDED_NOTE: &str = "excluded entries exist but are not expanded";

/// Result of one walk
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub root: SnapshotNode,
    pub notes: Vec<String>,
    pub stats: SnapshotStats,
}

impl Snapshot {
    /// Wrap into a context keyed by `root_path`
    pub fn into_context(self, root_path: impl Into<String>) -> CodebaseContext {
        let mut context = CodebaseContext::new(root_path, self.root);
        for note in self.notes {
            context.add_note(note);
        }
        context
    }
}

/// Walks a directory into a [`SnapshotNode`] tree
pub struct SnapshotBuilder {
    config: SnapshotConfig,
    ignore: IgnoreList,
    extractors: Extractors,
}

impl SnapshotBuilder {
    pub fn new(config: SnapshotConfig, ignore: IgnoreList) -> Self {
        Self {
            config,
            ignore,
            extractors: Extractors::new(),
        }
    }

    /// Builder whose ignore list comes from `root` and `config`
    pub fn for_root(root: &Path, config: SnapshotConfig) -> Result<Self> {
        config.validate().map_err(SnapshotError::InvalidConfig)?;

        let mut ignore = IgnoreList::load(root.join(&config.ignore_file_name));
        ignore.extend(&config.extra_patterns);
        if config.use_default_excludes {
            ignore = ignore.with_default_excludes();
        }
        Ok(Self::new(config, ignore))
    }

    /// Walk `root` in pre-order.
    ///
    /// Only a missing or unreadable root is an error. Unreadable entries are
    /// logged and skipped; files that cannot be parsed keep an empty
    /// identifier set.
    pub fn build(&mut self, root: &Path) -> Result<Snapshot> {
        check_root(root)?;
        let started = Instant::now();

        let mut tree = SnapshotNode::directory();
        let mut stats = SnapshotStats::new();

        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    if e.depth() == 0 {
                        return Err(SnapshotError::RootUnreadable {
                            path: root.to_path_buf(),
                            source: e.into(),
                        });
                    }
                    log::warn!("Failed to read entry: {e}");
                    stats.add_error();
                    continue;
                }
            };

            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            let parts: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            let Some((name, ancestors)) = parts.split_last() else {
                continue;
            };
            let rel_path = parts.join("/");
            let is_dir = entry.file_type().is_dir();
            let siblings = ensure_directories(&mut tree, ancestors);

            if self.ignore.matches(&rel_path) {
                log::debug!("Excluded {rel_path}");
                siblings.insert(name.clone(), SnapshotNode::excluded(is_dir));
                stats.add_excluded();
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }

            if is_dir {
                // may already exist when a descendant was seen first
                siblings
                    .entry(name.clone())
                    .or_insert_with(SnapshotNode::directory);
                stats.add_directory();
                continue;
            }

            let identifiers = self.identifiers_for(entry.path(), &rel_path, &mut stats);
            stats.add_file(identifiers.len());
            siblings.insert(name.clone(), SnapshotNode::file(identifiers));
        }

        let mut notes = Vec::new();
        if stats.excluded > 0 {
            notes.push(EXCLUDED_NOTE.to_string());
        }
        if stats.oversized > 0 {
            notes.push(format!(
                "{} files larger than {} bytes are listed without identifiers",
                stats.oversized, self.config.max_file_bytes
            ));
        }

        stats.time_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "Snapshot of {}: {} files, {} directories, {} excluded, {} identifiers in {} ms",
            root.display(),
            stats.files,
            stats.directories,
            stats.excluded,
            stats.identifiers,
            stats.time_ms
        );

        Ok(Snapshot {
            root: tree,
            notes,
            stats,
        })
    }

    fn identifiers_for(&mut self, path: &Path, rel_path: &str, stats: &mut SnapshotStats) -> BTreeSet<String> {
        if !Extractors::supports(path) {
            log::trace!("No extractor for {rel_path}");
            return BTreeSet::new();
        }

        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > self.config.max_file_bytes => {
                log::debug!(
                    "Skipping large file {} ({} bytes > {})",
                    rel_path,
                    meta.len(),
                    self.config.max_file_bytes
                );
                stats.add_oversized();
                return BTreeSet::new();
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("Failed to stat {rel_path}: {e}");
                stats.add_error();
                return BTreeSet::new();
            }
        }

        let source = match std::fs::read(path) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("Failed to read {rel_path}: {e}");
                stats.add_error();
                return BTreeSet::new();
            }
        };

        match self.extractors.extract_file(path, &source) {
            Ok(identifiers) => identifiers,
            Err(ExtractError::NoExtractor(_)) => BTreeSet::new(),
            Err(e) => {
                log::debug!("Failed to parse {rel_path}: {e}");
                BTreeSet::new()
            }
        }
    }
}

fn check_root(root: &Path) -> Result<()> {
    let meta = std::fs::metadata(root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SnapshotError::RootMissing(root.to_path_buf()),
        _ => SnapshotError::RootUnreadable {
            path: root.to_path_buf(),
            source: e,
        },
    })?;
    if !meta.is_dir() {
        return Err(SnapshotError::NotADirectory(root.to_path_buf()));
    }
    std::fs::read_dir(root).map_err(|source| SnapshotError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Children map of the directory at `ancestors`, creating directory nodes
/// on first reference
fn ensure_directories<'a>(
    root: &'a mut SnapshotNode,
    ancestors: &[String],
) -> &'a mut BTreeMap<String, SnapshotNode> {
    let mut node = root;
    for part in ancestors {
        node = node
            .children
            .get_or_insert_with(BTreeMap::new)
            .entry(part.clone())
            .or_insert_with(SnapshotNode::directory);
    }
    node.children.get_or_insert_with(BTreeMap::new)
}

/// Load the ignore file under `root`, walk it and wrap the result in a
/// context keyed by the root's display path
pub fn load_snapshot_context(root: &Path, config: SnapshotConfig) -> Result<(CodebaseContext, SnapshotStats)> {
    let mut builder = SnapshotBuilder::for_root(root, config)?;
    let snapshot = builder.build(root)?;
    let stats = snapshot.stats.clone();
    Ok((snapshot.into_context(root.display().to_string()), stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ensure_directories_creates_ancestors_once() {
        let mut root = SnapshotNode::directory();
        let parts = vec!["a".to_string(), "b".to_string()];
        ensure_directories(&mut root, &parts).insert("c.go".into(), SnapshotNode::file(BTreeSet::new()));
        ensure_directories(&mut root, &parts).insert("d.go".into(), SnapshotNode::file(BTreeSet::new()));

        let b = root.lookup("a/b").unwrap();
        assert!(b.is_directory);
        assert_eq!(b.children.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_root() {
        let mut builder = SnapshotBuilder::new(SnapshotConfig::default(), IgnoreList::new());
        let err = builder
            .build(Path::new("/definitely/not/here/ctx"))
            .unwrap_err();
        assert!(matches!(err, SnapshotError::RootMissing(_)));
    }
}
