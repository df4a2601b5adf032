use crate::close::CloseReason;
use crate::envelope::{SessionRequest, SessionResponse};
use crate::error::{SchemaViolation, SessionError};
use crate::files::FileSource;
use crate::payloads::{FileChange, FileChangePlan, LoadAck, PatchData};
use crate::snapshot::CodebaseContext;
use crate::stage::{SessionState, Stage};
use crate::transport::{Inbound, Transport};
use crate::validate::{validate_load, validate_select, validate_work};
use crate::work_prompt::file_work_prompt;
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;

/// What to do with the remaining WORK requests once one of them fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkFailurePolicy {
    /// Record the failure for that file and continue with the next
    #[default]
    SkipFile,
    /// Stop issuing WORK requests for the rest of the plan
    Abort,
}

/// Session settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub client_id: String,
    /// Upper bound on the wait for each reply
    pub response_timeout: Option<Duration>,
    pub work_failure_policy: WorkFailurePolicy,
}

impl SessionConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            response_timeout: None,
            work_failure_policy: WorkFailurePolicy::default(),
        }
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    pub fn with_work_failure_policy(mut self, policy: WorkFailurePolicy) -> Self {
        self.work_failure_policy = policy;
        self
    }
}

/// Why a stage reply was not accepted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageFailure {
    #[error("peer replied with status {0:?}")]
    Status(String),

    #[error(transparent)]
    Violation(#[from] SchemaViolation),
}

/// Result of one stage exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome<T> {
    Completed(T),
    Failed(StageFailure),
}

impl<T> StageOutcome<T> {
    fn from_result(result: Result<T, StageFailure>) -> Self {
        match result {
            Ok(value) => StageOutcome::Completed(value),
            Err(failure) => StageOutcome::Failed(failure),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, StageOutcome::Completed(_))
    }

    pub fn completed(&self) -> Option<&T> {
        match self {
            StageOutcome::Completed(value) => Some(value),
            StageOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        match self {
            StageOutcome::Completed(_) => None,
            StageOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// WORK outcome for one planned file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkResult {
    pub change: FileChange,
    pub outcome: StageOutcome<PatchData>,
}

/// Everything a full run produced
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub load: StageOutcome<LoadAck>,
    pub plan: StageOutcome<FileChangePlan>,
    pub work: Vec<WorkResult>,
}

impl SessionReport {
    pub fn patches(&self) -> impl Iterator<Item = &PatchData> {
        self.work.iter().filter_map(|result| result.outcome.completed())
    }
}

/// Client side of the staged exchange.
///
/// Stages run once each in fixed order; WORK repeats once per file of the
/// accepted change plan. Only one request is outstanding at a time.
pub struct Session<T, F> {
    config: SessionConfig,
    transport: T,
    files: F,
    context: CodebaseContext,
    state: SessionState,
    task: Option<String>,
    pending: VecDeque<FileChange>,
}

impl<T: Transport, F: FileSource> Session<T, F> {
    pub fn new(config: SessionConfig, transport: T, context: CodebaseContext, files: F) -> Self {
        Self {
            config,
            transport,
            files,
            context,
            state: SessionState::Idle,
            task: None,
            pending: VecDeque::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> &CodebaseContext {
        &self.context
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Files still waiting for a WORK request
    pub fn pending_work(&self) -> impl Iterator<Item = &FileChange> {
        self.pending.iter()
    }

    /// LOAD: hand the codebase context over. A rejected acknowledgement is
    /// logged and the session still moves on to SELECT.
    pub async fn load(&mut self) -> Result<StageOutcome<LoadAck>, SessionError> {
        self.expect_state(Stage::Load, SessionState::Idle)?;

        let request = SessionRequest::load(self.config.client_id.clone(), self.context.clone());
        request.check()?;
        log::info!(
            "Loading codebase context ({} bytes)",
            self.context.encoded_len()
        );
        self.state = SessionState::AwaitingLoadAck;
        let response = self.exchange(request).await?;

        let outcome = StageOutcome::from_result(
            accept(&response, Stage::Load)
                .and_then(|data| validate_load(data).map_err(StageFailure::from)),
        );
        match &outcome {
            StageOutcome::Completed(_) => log::debug!("Load acknowledged"),
            StageOutcome::Failed(failure) => log::warn!("Load stage failed: {failure}"),
        }

        self.state = SessionState::ReadyForSelect;
        Ok(outcome)
    }

    /// SELECT: ask for a change plan, then read every listed file that
    /// already exists into the context.
    pub async fn select(
        &mut self,
        task: impl Into<String>,
    ) -> Result<StageOutcome<FileChangePlan>, SessionError> {
        self.expect_state(Stage::Select, SessionState::ReadyForSelect)?;

        let task = task.into();
        let request = SessionRequest::select(
            self.config.client_id.clone(),
            self.context.clone(),
            task.clone(),
        );
        // a rejected task leaves the session ready for another attempt
        request.check()?;
        self.state = SessionState::AwaitingSelectResponse;
        let response = self.exchange(request).await?;

        let outcome = StageOutcome::from_result(
            accept(&response, Stage::Select)
                .and_then(|data| validate_select(data).map_err(StageFailure::from)),
        );

        match &outcome {
            StageOutcome::Completed(plan) => {
                log::info!(
                    "Change plan: {} files, {} context files",
                    plan.files.len(),
                    plan.additional_context_files.len()
                );
                self.gather_files(plan);
                self.pending = plan.files.iter().cloned().collect();
                self.task = Some(task);
                self.state = if self.pending.is_empty() {
                    SessionState::Done
                } else {
                    SessionState::AwaitingWorkResponse
                };
            }
            StageOutcome::Failed(failure) => {
                log::warn!("Select stage failed: {failure}");
                self.state = SessionState::Done;
            }
        }

        Ok(outcome)
    }

    /// WORK for the next planned file. `None` once the plan is exhausted.
    pub async fn work_next(&mut self) -> Result<Option<WorkResult>, SessionError> {
        match self.state {
            SessionState::AwaitingWorkResponse => {}
            SessionState::Done => return Ok(None),
            state => {
                return Err(SessionError::OutOfOrder {
                    stage: Stage::Work,
                    state,
                })
            }
        }

        let Some(change) = self.pending.pop_front() else {
            self.state = SessionState::Done;
            return Ok(None);
        };

        let prompt = file_work_prompt(
            &change.path,
            change.operation,
            self.context.file_content(&change.path),
        );
        let request = SessionRequest::work(
            self.config.client_id.clone(),
            self.context.clone(),
            self.task.clone().unwrap_or_default(),
            prompt,
        );
        let response = self.exchange(request).await?;

        let outcome = StageOutcome::from_result(
            accept(&response, Stage::Work)
                .and_then(|data| validate_work(data, &change.path).map_err(StageFailure::from)),
        );

        match &outcome {
            StageOutcome::Completed(patch) => {
                log::info!("Patch for {}: {}", patch.path, patch.summary);
            }
            StageOutcome::Failed(failure) => {
                log::warn!("Work stage failed for {}: {failure}", change.path);
                if self.config.work_failure_policy == WorkFailurePolicy::Abort && !self.pending.is_empty() {
                    log::info!("Abandoning {} remaining files", self.pending.len());
                    self.pending.clear();
                }
            }
        }

        if self.pending.is_empty() {
            self.state = SessionState::Done;
        }

        Ok(Some(WorkResult { change, outcome }))
    }

    /// WORK for every remaining planned file, in plan order
    pub async fn work_all(&mut self) -> Result<Vec<WorkResult>, SessionError> {
        let mut results = Vec::with_capacity(self.pending.len());
        while let Some(result) = self.work_next().await? {
            results.push(result);
        }
        Ok(results)
    }

    /// LOAD, SELECT and WORK for the whole plan
    pub async fn run(&mut self, task: impl Into<String>) -> Result<SessionReport, SessionError> {
        let load = self.load().await?;
        let plan = self.select(task).await?;
        let work = self.work_all().await?;
        Ok(SessionReport { load, plan, work })
    }

    /// Send a close frame. No stage may be requested afterwards.
    pub async fn close(&mut self, reason: CloseReason) -> Result<(), SessionError> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        self.pending.clear();
        self.transport.close(reason).await?;
        Ok(())
    }

    fn expect_state(&self, stage: Stage, expected: SessionState) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::OutOfOrder {
                stage,
                state: self.state,
            })
        }
    }

    fn gather_files(&mut self, plan: &FileChangePlan) {
        for change in plan.entries() {
            if !change.operation.has_existing_content() {
                log::trace!("Not reading {} ({})", change.path, change.operation);
                continue;
            }
            if self.context.file_content(&change.path).is_some() {
                continue;
            }
            match self.files.read(&change.path) {
                Ok(content) => {
                    self.context.add_file_content(change.path.clone(), content);
                }
                Err(e) => log::warn!("Skipping {}: {e}", change.path),
            }
        }
    }

    async fn exchange(&mut self, request: SessionRequest) -> Result<SessionResponse, SessionError> {
        request.check()?;
        let stage = request.stage;
        let text = request.encode()?;
        log::debug!("Sending {stage} request ({} bytes)", text.len());
        self.transport.send(text).await?;
        self.await_response(stage).await
    }

    async fn await_response(&mut self, stage: Stage) -> Result<SessionResponse, SessionError> {
        loop {
            let inbound = match self.config.response_timeout {
                Some(after) => match tokio::time::timeout(after, self.transport.recv()).await {
                    Ok(inbound) => inbound?,
                    Err(_) => {
                        // a late reply must not answer a later request
                        log::warn!("No {stage} reply within {after:?}");
                        self.state = SessionState::Closed;
                        self.pending.clear();
                        return Err(SessionError::Timeout { stage, after });
                    }
                },
                None => self.transport.recv().await?,
            };

            match inbound {
                Inbound::Text(text) => match SessionResponse::decode(&text) {
                    Ok(response) => return Ok(response),
                    Err(e) => log::warn!("Dropping undecodable {stage} reply: {e}"),
                },
                Inbound::Closed(reason) => {
                    log::info!("Peer closed the session while awaiting {stage}");
                    self.state = SessionState::Closed;
                    self.pending.clear();
                    return Err(SessionError::Closed { reason });
                }
            }
        }
    }
}

fn accept(response: &SessionResponse, stage: Stage) -> Result<&Value, StageFailure> {
    if response.stage != stage {
        return Err(SchemaViolation::StageMismatch {
            expected: stage,
            found: response.stage,
        }
        .into());
    }
    if !response.is_ok() {
        return Err(StageFailure::Status(response.status.clone()));
    }
    Ok(&response.data)
}
