use ctx_protocol::{FileChangePlan, PatchData, SessionReport};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// A planned file whose WORK reply was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub path: String,
    pub reason: String,
}

/// Printable result of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub load_ok: bool,
    pub plan: Option<FileChangePlan>,
    pub patches: Vec<PatchData>,
    pub failed: Vec<FailedFile>,
}

impl RunSummary {
    pub fn from_report(report: &SessionReport) -> Self {
        let failed = report
            .work
            .iter()
            .filter_map(|result| {
                result.outcome.failure().map(|failure| FailedFile {
                    path: result.change.path.clone(),
                    reason: failure.to_string(),
                })
            })
            .collect();
        Self {
            load_ok: report.load.is_completed(),
            plan: report.plan.completed().cloned(),
            patches: report.patches().cloned().collect(),
            failed,
        }
    }
}

/// Write each patch to `<out_dir>/<path>.patch`
pub fn write_patches<'a>(
    out_dir: &Path,
    patches: impl IntoIterator<Item = &'a PatchData>,
) -> io::Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for patch in patches {
        let rel = Path::new(&patch.path);
        if !rel.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir)) {
            log::warn!("Skipping patch with unsafe path {}", patch.path);
            continue;
        }
        let dest = out_dir.join(format!("{}.patch", patch.path));
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, &patch.patch)?;
        log::debug!("Wrote {}", dest.display());
        written.push(dest);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn patch(path: &str) -> PatchData {
        PatchData {
            path: path.to_string(),
            patch: format!("--- a/{path}\n+++ b/{path}\n"),
            summary: "edit".to_string(),
        }
    }

    #[test]
    fn test_patches_mirror_source_layout() {
        let temp = TempDir::new().unwrap();
        let patches = vec![patch("main.go"), patch("internal/store/store.go")];

        let written = write_patches(temp.path(), &patches).unwrap();

        assert_eq!(
            written,
            vec![
                temp.path().join("main.go.patch"),
                temp.path().join("internal/store/store.go.patch"),
            ]
        );
        assert_eq!(
            fs::read_to_string(&written[1]).unwrap(),
            "--- a/internal/store/store.go\n+++ b/internal/store/store.go\n"
        );
    }

    #[test]
    fn test_escaping_paths_are_skipped() {
        let temp = TempDir::new().unwrap();
        let patches = vec![patch("../outside.go"), patch("/etc/passwd")];
        assert!(write_patches(temp.path(), &patches).unwrap().is_empty());
    }
}
