use crate::backend::{GenerateOptions, ModelBackend};
use crate::dump::spawn_context_dump;
use ctx_protocol::{
    prompt_parts, status, work_prompt_path, CloseReason, SessionRequest, SessionResponse, Stage,
    StagePayload,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// What the connection loop does with one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerAction {
    Reply(SessionResponse),
    Close(CloseReason),
    Ignore,
}

/// Per-connection stage gate and model dispatch
pub struct StageHandler {
    backend: Arc<dyn ModelBackend>,
    temperature: f64,
    dump_path: Option<PathBuf>,
    served: HashSet<Stage>,
}

impl StageHandler {
    pub fn new(backend: Arc<dyn ModelBackend>, temperature: f64) -> Self {
        Self {
            backend,
            temperature,
            dump_path: None,
            served: HashSet::new(),
        }
    }

    pub fn with_dump_path(mut self, path: Option<PathBuf>) -> Self {
        self.dump_path = path;
        self
    }

    pub fn has_served(&self, stage: Stage) -> bool {
        self.served.contains(&stage)
    }

    pub async fn handle_text(&mut self, text: &str) -> HandlerAction {
        match SessionRequest::decode(text) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                log::warn!("Dropping undecodable request: {}", e);
                HandlerAction::Ignore
            }
        }
    }

    pub async fn handle_request(&mut self, request: SessionRequest) -> HandlerAction {
        let stage = request.stage;
        if let Err(e) = request.check() {
            log::warn!("clientID={} stage={}: {}", request.client_id, stage, e);
            return HandlerAction::Reply(SessionResponse::error(stage, status::INVALID_REQUEST));
        }
        if !self.gate_open(stage) {
            log::warn!(
                "clientID={} stage={} arrived out of order",
                request.client_id,
                stage
            );
            return HandlerAction::Reply(SessionResponse::error(stage, status::OUT_OF_ORDER));
        }

        if stage == Stage::Load {
            if let Some(path) = &self.dump_path {
                // detached, never blocks the reply
                let _ = spawn_context_dump(path.clone(), &request.context);
            }
        }

        let parts = match prompt_parts(&request) {
            Ok(parts) => parts,
            Err(e) => {
                log::error!("clientID={} stage={}: {}", request.client_id, stage, e);
                return HandlerAction::Close(CloseReason::InternalError);
            }
        };
        log::info!(
            "clientID={} stage={} context_len={}",
            request.client_id,
            stage,
            parts.first().map_or(0, String::len)
        );

        let options = GenerateOptions::for_stage(stage, self.temperature);
        let started = Instant::now();
        let generated = self.backend.generate(&parts, &options).await;
        let elapsed_ms = started.elapsed().as_millis();

        let text = match generated {
            Ok(text) => text,
            Err(e) => {
                log::error!(
                    "clientID={} stage={} model={} failed after {}ms: {}",
                    request.client_id,
                    stage,
                    self.backend.name(),
                    elapsed_ms,
                    e
                );
                return HandlerAction::Close(CloseReason::InternalError);
            }
        };
        log::info!(
            "clientID={} stage={} model={} elapsed_ms={}",
            request.client_id,
            stage,
            self.backend.name(),
            elapsed_ms
        );
        self.served.insert(stage);

        let target = request.file_work_prompt.as_deref().and_then(work_prompt_path);
        match StagePayload::from_model_text(stage, &text, target) {
            Ok(payload) => HandlerAction::Reply(SessionResponse::ok(stage, payload.to_value())),
            Err(violation) => {
                log::warn!(
                    "clientID={} stage={} model output rejected: {}",
                    request.client_id,
                    stage,
                    violation
                );
                HandlerAction::Reply(SessionResponse::error(stage, status::SCHEMA_VIOLATION))
            }
        }
    }

    /// Prerequisite served, and LOAD/SELECT at most once per connection
    fn gate_open(&self, stage: Stage) -> bool {
        let prerequisite_met = stage
            .prerequisite()
            .map_or(true, |required| self.served.contains(&required));
        let repeatable = stage == Stage::Work || !self.served.contains(&stage);
        prerequisite_met && repeatable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubBackend;
    use ctx_protocol::{CodebaseContext, SnapshotNode};
    use pretty_assertions::assert_eq;

    fn handler() -> StageHandler {
        StageHandler::new(Arc::new(StubBackend::new()), 0.8)
    }

    fn context() -> CodebaseContext {
        CodebaseContext::new("/repo", SnapshotNode::directory())
    }

    fn reply_status(action: HandlerAction) -> String {
        match action {
            HandlerAction::Reply(response) => response.status,
            other => panic!("expected a reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_select_before_load_is_out_of_order() {
        let mut handler = handler();
        let action = handler
            .handle_request(SessionRequest::select("c1", context(), "task"))
            .await;
        assert_eq!(reply_status(action), status::OUT_OF_ORDER);
        assert!(!handler.has_served(Stage::Select));
    }

    #[tokio::test]
    async fn test_load_then_select_is_served_once() {
        let mut handler = handler();
        let load = handler.handle_request(SessionRequest::load("c1", context())).await;
        assert_eq!(reply_status(load), status::OK);

        let select = handler
            .handle_request(SessionRequest::select("c1", context(), "task"))
            .await;
        assert_eq!(reply_status(select), status::OK);

        let again = handler.handle_request(SessionRequest::load("c1", context())).await;
        assert_eq!(reply_status(again), status::OUT_OF_ORDER);
    }

    #[tokio::test]
    async fn test_invalid_envelope_and_garbage() {
        let mut handler = handler();
        let mut request = SessionRequest::load("c1", context());
        request.task_prompt = Some("not allowed".into());
        assert_eq!(
            reply_status(handler.handle_request(request).await),
            status::INVALID_REQUEST
        );
        assert_eq!(handler.handle_text("not json").await, HandlerAction::Ignore);
    }

    #[tokio::test]
    async fn test_work_repeats_per_file() {
        let mut handler = handler();
        handler.handle_request(SessionRequest::load("c1", context())).await;
        handler
            .handle_request(SessionRequest::select("c1", context(), "task"))
            .await;
        for path in ["a.go", "b.go"] {
            let request = SessionRequest::work("c1", context(), "task", format!("File: {path}\n"));
            match handler.handle_request(request).await {
                HandlerAction::Reply(response) => {
                    assert!(response.is_ok());
                    assert_eq!(response.data["path"], path);
                }
                other => panic!("expected a reply, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_load_dump_is_written() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("code.ctx");
        let mut handler = handler().with_dump_path(Some(path.clone()));
        handler.handle_request(SessionRequest::load("c1", context())).await;

        for _ in 0..100 {
            if path.exists() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("dump never appeared");
    }
}
