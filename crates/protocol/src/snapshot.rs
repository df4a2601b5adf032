use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

fn is_false(value: &bool) -> bool {
    !*value
}

/// One filesystem entry of a codebase snapshot.
///
/// A node is a directory (`children` present), an included file
/// (`identifiers` present) or an excluded marker (neither present).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotNode {
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_directory: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<BTreeMap<String, SnapshotNode>>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub excluded: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifiers: Option<BTreeSet<String>>,
}

impl SnapshotNode {
    pub fn directory() -> Self {
        Self {
            is_directory: true,
            children: Some(BTreeMap::new()),
            ..Self::default()
        }
    }

    pub fn file(identifiers: BTreeSet<String>) -> Self {
        Self {
            identifiers: Some(identifiers),
            ..Self::default()
        }
    }

    /// Marker for an entry matched by the ignore list
    pub fn excluded(is_directory: bool) -> Self {
        Self {
            is_directory,
            excluded: true,
            ..Self::default()
        }
    }

    pub fn is_file(&self) -> bool {
        !self.is_directory
    }

    pub fn child(&self, name: &str) -> Option<&SnapshotNode> {
        self.children.as_ref()?.get(name)
    }

    /// Resolve a `/`-separated path relative to this node
    pub fn lookup(&self, rel_path: &str) -> Option<&SnapshotNode> {
        rel_path
            .split('/')
            .filter(|part| !part.is_empty())
            .try_fold(self, |node, part| node.child(part))
    }

    /// Number of included files below this node
    pub fn file_count(&self) -> usize {
        match &self.children {
            Some(children) => children.values().map(SnapshotNode::file_count).sum(),
            None if self.identifiers.is_some() => 1,
            None => 0,
        }
    }
}

/// Unit of knowledge shared with the remote side.
///
/// `file_contents` only grows: entries are inserted once and never replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseContext {
    snapshot: BTreeMap<String, SnapshotNode>,
    #[serde(default)]
    notes: Vec<String>,
    #[serde(default)]
    file_contents: BTreeMap<String, String>,
}

impl CodebaseContext {
    pub fn new(root_path: impl Into<String>, root: SnapshotNode) -> Self {
        let mut snapshot = BTreeMap::new();
        snapshot.insert(root_path.into(), root);
        Self {
            snapshot,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> &BTreeMap<String, SnapshotNode> {
        &self.snapshot
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        let note = note.into();
        if !self.notes.contains(&note) {
            self.notes.push(note);
        }
    }

    pub fn file_contents(&self) -> &BTreeMap<String, String> {
        &self.file_contents
    }

    pub fn file_content(&self, path: &str) -> Option<&str> {
        self.file_contents.get(path).map(String::as_str)
    }

    /// Insert a file body. Returns `false` and keeps the existing body when
    /// `path` is already present.
    pub fn add_file_content(&mut self, path: impl Into<String>, content: impl Into<String>) -> bool {
        match self.file_contents.entry(path.into()) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(content.into());
                true
            }
        }
    }

    /// Serialized size, logged by both peers
    pub fn encoded_len(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }
}
