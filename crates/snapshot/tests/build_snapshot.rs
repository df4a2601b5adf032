use ctx_protocol::SnapshotNode;
use ctx_snapshot::{
    load_snapshot_context, IgnoreList, SnapshotBuilder, SnapshotConfig, SnapshotError,
    EXCLUDED_NOTE,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, body).expect("write file");
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn main_go_and_ignored_directory() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write(root, "main.go", "package main\n\nfunc main() {}\n\nfunc foo() {}\n");
    write(root, "ignored/secret.go", "package ignored\n\nfunc hidden() {}\n");

    let mut builder = SnapshotBuilder::new(
        SnapshotConfig::ignore_file_only(),
        IgnoreList::parse("ignored\n"),
    );
    let snapshot = builder.build(root).expect("build");

    let children = snapshot.root.children.as_ref().expect("root children");
    assert_eq!(children.len(), 2);
    assert_eq!(children["main.go"], SnapshotNode::file(set(&["foo", "main"])));

    let ignored = &children["ignored"];
    assert!(ignored.excluded);
    assert!(ignored.is_directory);
    assert!(ignored.children.is_none());

    assert_eq!(snapshot.stats.files, 1);
    assert_eq!(snapshot.stats.excluded, 1);
    assert_eq!(snapshot.notes, vec![EXCLUDED_NOTE.to_string()]);
}

#[test]
fn every_included_file_appears_once() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    let files = [
        "cmd/app/main.go",
        "internal/store/store.go",
        "internal/store/store_test.go",
        "web/src/index.ts",
        "web/src/App.tsx",
        "scripts/deploy.py",
        "README.md",
        "Dockerfile",
    ];
    for rel in files {
        write(root, rel, "");
    }
    write(root, "web/dist/bundle.js", "");

    let mut builder = SnapshotBuilder::new(
        SnapshotConfig::ignore_file_only(),
        IgnoreList::parse("web/dist\n"),
    );
    let snapshot = builder.build(root).expect("build");

    for rel in files {
        let node = snapshot
            .root
            .lookup(rel)
            .unwrap_or_else(|| panic!("{rel} missing"));
        assert!(node.is_file(), "{rel} should be a file");
        assert!(node.identifiers.is_some(), "{rel} should carry identifiers");
    }
    assert_eq!(snapshot.root.file_count(), files.len());

    let dist = snapshot.root.lookup("web/dist").expect("dist marker");
    assert!(dist.excluded);
    assert!(snapshot.root.lookup("web/dist/bundle.js").is_none());
}

#[test]
fn unsupported_and_broken_files_keep_empty_identifiers() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write(root, "notes.txt", "plain words here");
    write(root, "broken.py", "def (:\n");

    let mut builder = SnapshotBuilder::new(SnapshotConfig::ignore_file_only(), IgnoreList::new());
    let snapshot = builder.build(root).expect("build");

    assert_eq!(
        snapshot.root.lookup("notes.txt"),
        Some(&SnapshotNode::file(BTreeSet::new()))
    );
    assert!(snapshot.root.lookup("broken.py").is_some_and(SnapshotNode::is_file));
}

#[test]
fn oversized_files_are_listed_without_identifiers() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write(root, "big.go", "package big\n\nfunc enormous() {}\n");

    let config = SnapshotConfig {
        max_file_bytes: 8,
        ..SnapshotConfig::ignore_file_only()
    };
    let mut builder = SnapshotBuilder::new(config, IgnoreList::new());
    let snapshot = builder.build(root).expect("build");

    assert_eq!(
        snapshot.root.lookup("big.go"),
        Some(&SnapshotNode::file(BTreeSet::new()))
    );
    assert_eq!(snapshot.stats.oversized, 1);
    assert_eq!(snapshot.notes.len(), 1);
}

#[test]
fn ignore_file_and_default_excludes_are_merged() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write(root, ".ctxignore", "# local\n*.gen.go\n");
    write(root, "api.gen.go", "package api\n");
    write(root, "api.go", "package api\n\nfunc Serve() {}\n");
    write(root, "node_modules/left-pad/index.js", "module.exports = 1;\n");

    let (context, stats) = load_snapshot_context(root, SnapshotConfig::default()).expect("load");
    let tree = &context.snapshot()[&root.display().to_string()];

    assert!(tree.lookup("api.gen.go").is_some_and(|n| n.excluded));
    assert!(tree.lookup("node_modules").is_some_and(|n| n.excluded && n.is_directory));
    assert_eq!(
        tree.lookup("api.go").and_then(|n| n.identifiers.clone()),
        Some(set(&["Serve", "api"]))
    );
    assert!(context.notes().contains(&EXCLUDED_NOTE.to_string()));
    assert!(context.file_contents().is_empty());
    assert_eq!(stats.excluded, 2);
}

#[test]
fn root_errors_are_fatal() {
    let temp = TempDir::new().expect("tempdir");
    let file = temp.path().join("plain.txt");
    fs::write(&file, "x").expect("write");

    let mut builder = SnapshotBuilder::new(SnapshotConfig::default(), IgnoreList::new());
    assert!(matches!(
        builder.build(&file),
        Err(SnapshotError::NotADirectory(_))
    ));
    assert!(matches!(
        builder.build(&temp.path().join("missing")),
        Err(SnapshotError::RootMissing(_))
    ));
}

#[test]
fn snapshot_serializes_for_load() {
    let temp = TempDir::new().expect("tempdir");
    write(temp.path(), "main.go", "package main\n\nfunc main() {}\n");

    let (context, _) =
        load_snapshot_context(temp.path(), SnapshotConfig::ignore_file_only()).expect("load");
    let value = serde_json::to_value(&context).expect("json");
    let key = temp.path().display().to_string();

    assert_eq!(
        value["snapshot"][key.as_str()]["children"]["main.go"]["identifiers"],
        serde_json::json!(["main"])
    );
    assert_eq!(value["fileContents"], serde_json::json!({}));
}
