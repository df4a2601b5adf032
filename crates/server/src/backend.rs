use async_trait::async_trait;
use ctx_protocol::Stage;
use thiserror::Error;

/// Generation settings for one model call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f64,
    /// Ask the model for a bare JSON document
    pub json_mode: bool,
    pub stage: Stage,
}

impl GenerateOptions {
    pub fn for_stage(stage: Stage, temperature: f64) -> Self {
        Self {
            temperature,
            json_mode: true,
            stage,
        }
    }
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("No API key: pass --api-key, set GCP_AI_API_KEY or write ~/.secrets/GCP_AI_API_KEY")]
    MissingApiKey,

    #[error("{0}")]
    Other(String),
}

/// Text generation capability behind the stage handler
#[async_trait]
pub trait ModelBackend: Send + Sync {
    fn name(&self) -> &str;

    /// `parts[0]` is always the serialized codebase context
    async fn generate(&self, parts: &[String], options: &GenerateOptions) -> Result<String, ModelError>;
}
