use crate::close::CloseReason;
use crate::stage::{SessionState, Stage};
use std::time::Duration;
use thiserror::Error;

/// Result type for envelope encoding and decoding
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Envelope-level errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Text is not a well-formed envelope
    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// Envelope decoded but breaks a per-stage field rule
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProtocolError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }
}

/// A stage reply that does not satisfy the stage's response schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    #[error("Malformed {stage} payload: {message}")]
    Malformed { stage: Stage, message: String },

    #[error("Stage mismatch: expected {expected}, got {found}")]
    StageMismatch { expected: Stage, found: Stage },

    #[error("Empty acknowledgement status")]
    EmptyStatus,

    #[error("Empty file path")]
    EmptyPath,

    #[error("Path must be relative to the codebase root: {0}")]
    NotRelative(String),

    #[error("Path listed more than once: {0}")]
    DuplicatePath(String),

    #[error("Patch targets {found}, expected {expected}")]
    WrongTarget { expected: String, found: String },

    #[error("Patch for {expected} touches {found}")]
    ForeignPatchPath { expected: String, found: String },
}

impl SchemaViolation {
    pub fn malformed(stage: Stage, message: impl Into<String>) -> Self {
        Self::Malformed {
            stage,
            message: message.into(),
        }
    }
}

/// Transport failures
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Receive failed: {0}")]
    Receive(String),
}

fn describe_close(reason: &Option<CloseReason>) -> String {
    reason.map_or_else(|| "no reason given".to_string(), |r| r.to_string())
}

/// Session-level errors that end the exchange
#[derive(Error, Debug)]
pub enum SessionError {
    /// A stage was requested before its prerequisite completed
    #[error("Stage {stage} requested out of order (session is {state})")]
    OutOfOrder { stage: Stage, state: SessionState },

    /// The peer closed the connection while a reply was pending
    #[error("Session closed by peer: {}", describe_close(.reason))]
    Closed { reason: Option<CloseReason> },

    #[error("No {stage} response within {after:?}")]
    Timeout { stage: Stage, after: Duration },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
