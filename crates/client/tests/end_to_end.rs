use ctx_client::{build_context, data_url, run_session, write_patches, PromptSource, RunSummary, WsTransport};
use ctx_protocol::{
    CloseReason, DirectoryFiles, FileChange, FileChangePlan, FileOperation, Session, SessionConfig,
    SessionError, SessionState,
};
use ctx_server::{
    router, AppState, GenerateOptions, ModelBackend, ModelError, ServerConfig, StubBackend,
};
use ctx_snapshot::SnapshotConfig;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, body).expect("write file");
}

async fn spawn_server(backend: Arc<dyn ModelBackend>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = router(AppState::new(backend, ServerConfig::default()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr.to_string()
}

fn plan() -> FileChangePlan {
    FileChangePlan {
        files: vec![
            FileChange::new("a.go", FileOperation::Create, "new helper"),
            FileChange::new("b.go", FileOperation::Update, "call the helper"),
        ],
        additional_context_files: vec![FileChange::new("main.go", FileOperation::Update, "entry point")],
    }
}

#[tokio::test]
async fn stub_server_returns_patches_for_the_plan() {
    let repo = TempDir::new().expect("tempdir");
    write(repo.path(), "main.go", "package main\n\nfunc main() {}\n");
    write(repo.path(), "b.go", "package main\n\nfunc B() {}\n");
    write(repo.path(), "node_modules/dep/index.js", "module.exports = 1;\n");

    let addr = spawn_server(Arc::new(StubBackend::new().with_plan(plan()))).await;
    let (context, stats) = build_context(repo.path().to_path_buf(), SnapshotConfig::default())
        .await
        .expect("snapshot");
    assert_eq!(stats.files, 2);

    let transport = WsTransport::connect(&data_url(&addr)).await.expect("connect");
    let mut session = Session::new(
        SessionConfig::new("e2e"),
        transport,
        context,
        DirectoryFiles::new(repo.path()),
    );
    let report = run_session(&mut session, PromptSource::Given("add a helper".into()))
        .await
        .expect("run");

    assert_eq!(session.state(), SessionState::Done);
    let gathered: Vec<&str> = session.context().file_contents().keys().map(String::as_str).collect();
    assert_eq!(gathered, vec!["b.go", "main.go"]);

    let summary = RunSummary::from_report(&report);
    assert!(summary.load_ok);
    assert_eq!(summary.plan, Some(plan()));
    let paths: Vec<&str> = summary.patches.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(paths, vec!["a.go", "b.go"]);
    assert!(summary.failed.is_empty());

    let out = TempDir::new().expect("out dir");
    let written = write_patches(out.path(), &summary.patches).expect("write patches");
    assert_eq!(written.len(), 2);
    assert!(fs::read_to_string(out.path().join("b.go.patch"))
        .expect("patch file")
        .starts_with("--- a/b.go"));

    session.close(CloseReason::Normal).await.expect("close");
}

#[tokio::test]
async fn blank_prompt_is_rejected_after_load() {
    let repo = TempDir::new().expect("tempdir");
    write(repo.path(), "main.go", "package main\n");

    let addr = spawn_server(Arc::new(StubBackend::new())).await;
    let (context, _) = build_context(repo.path().to_path_buf(), SnapshotConfig::default())
        .await
        .expect("snapshot");
    let transport = WsTransport::connect(&data_url(&addr)).await.expect("connect");
    let mut session = Session::new(
        SessionConfig::new("e2e"),
        transport,
        context,
        DirectoryFiles::new(repo.path()),
    );

    let result = run_session(&mut session, PromptSource::Given("   ".into())).await;
    assert!(result.is_err());
    assert_eq!(session.state(), SessionState::ReadyForSelect);
}

struct FailingBackend;

#[async_trait::async_trait]
impl ModelBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _parts: &[String], _options: &GenerateOptions) -> Result<String, ModelError> {
        Err(ModelError::Other("quota exhausted".into()))
    }
}

#[tokio::test]
async fn model_failure_ends_the_session_with_internal_error() {
    let repo = TempDir::new().expect("tempdir");
    write(repo.path(), "main.go", "package main\n");

    let addr = spawn_server(Arc::new(FailingBackend)).await;
    let (context, _) = build_context(repo.path().to_path_buf(), SnapshotConfig::default())
        .await
        .expect("snapshot");
    let transport = WsTransport::connect(&data_url(&addr)).await.expect("connect");
    let mut session = Session::new(
        SessionConfig::new("e2e"),
        transport,
        context,
        DirectoryFiles::new(repo.path()),
    );

    let error = session.load().await.expect_err("load should fail");
    assert!(matches!(
        error,
        SessionError::Closed {
            reason: Some(CloseReason::InternalError)
        }
    ));
    assert_eq!(session.state(), SessionState::Closed);
}
