use crate::error::{ProtocolError, Result};
use crate::snapshot::CodebaseContext;
use crate::stage::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response status tags
pub mod status {
    pub const OK: &str = "ok";
    /// Stage requested before its prerequisite was served
    pub const OUT_OF_ORDER: &str = "out_of_order";
    /// Request envelope broke a per-stage field rule
    pub const INVALID_REQUEST: &str = "invalid_request";
    /// Model output did not satisfy the stage's response schema
    pub const SCHEMA_VIOLATION: &str = "schema_violation";
}

/// Client → server envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub stage: Stage,
    pub context: CodebaseContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_work_prompt: Option<String>,
}

impl SessionRequest {
    pub fn load(client_id: impl Into<String>, context: CodebaseContext) -> Self {
        Self {
            client_id: client_id.into(),
            stage: Stage::Load,
            context,
            task_prompt: None,
            file_work_prompt: None,
        }
    }

    pub fn select(
        client_id: impl Into<String>,
        context: CodebaseContext,
        task_prompt: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            stage: Stage::Select,
            context,
            task_prompt: Some(task_prompt.into()),
            file_work_prompt: None,
        }
    }

    pub fn work(
        client_id: impl Into<String>,
        context: CodebaseContext,
        task_prompt: impl Into<String>,
        file_work_prompt: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            stage: Stage::Work,
            context,
            task_prompt: Some(task_prompt.into()),
            file_work_prompt: Some(file_work_prompt.into()),
        }
    }

    /// Check prompt presence against the stage
    pub fn check(&self) -> Result<()> {
        match (self.stage, &self.task_prompt, &self.file_work_prompt) {
            (Stage::Load, None, None) => Ok(()),
            (Stage::Load, _, _) => Err(ProtocolError::invalid_request(
                "load carries the context only",
            )),
            (Stage::Select, Some(task), None) if !task.trim().is_empty() => Ok(()),
            (Stage::Select, _, _) => Err(ProtocolError::invalid_request(
                "select needs a task prompt and no file prompt",
            )),
            (Stage::Work, Some(task), Some(file)) if !task.trim().is_empty() && !file.is_empty() => {
                Ok(())
            }
            (Stage::Work, _, _) => Err(ProtocolError::invalid_request(
                "work needs both a task prompt and a file prompt",
            )),
        }
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

/// Server → client envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub timestamp: DateTime<Utc>,
    pub stage: Stage,
    pub status: String,
    #[serde(default)]
    pub data: Value,
}

impl SessionResponse {
    pub fn ok(stage: Stage, data: Value) -> Self {
        Self {
            timestamp: Utc::now(),
            stage,
            status: status::OK.to_string(),
            data,
        }
    }

    /// Error reply with a status tag and no payload
    pub fn error(stage: Stage, tag: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            stage,
            status: tag.into(),
            data: Value::Null,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == status::OK
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}
