use ctx_protocol::CodebaseContext;
use std::io;
use std::path::PathBuf;
use tokio::task::JoinHandle;

/// Write `context` to `path` as pretty JSON on a detached task.
///
/// Failures are logged here; the handle only reports them to callers
/// that care to wait.
pub fn spawn_context_dump(path: PathBuf, context: &CodebaseContext) -> JoinHandle<io::Result<()>> {
    let encoded = serde_json::to_vec_pretty(context);
    tokio::spawn(async move {
        let result = match encoded {
            Ok(bytes) => tokio::fs::write(&path, bytes).await,
            Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        };
        match &result {
            Ok(()) => log::debug!("Context dumped to {}", path.display()),
            Err(e) => log::warn!("Context dump to {} failed: {}", path.display(), e),
        }
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctx_protocol::SnapshotNode;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_dump_writes_context() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("code.ctx");
        let mut context = CodebaseContext::new("/repo", SnapshotNode::directory());
        context.add_note("hello");

        spawn_context_dump(path.clone(), &context).await.unwrap().unwrap();

        let written: CodebaseContext =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, context);
    }

    #[tokio::test]
    async fn test_dump_failure_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing").join("code.ctx");
        let context = CodebaseContext::new("/repo", SnapshotNode::directory());

        assert!(spawn_context_dump(path, &context).await.unwrap().is_err());
    }
}
