use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three fixed steps of a session, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Load,
    Select,
    Work,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Select => "select",
            Stage::Work => "work",
        }
    }

    /// Stage that must have completed before this one may be requested
    pub fn prerequisite(self) -> Option<Stage> {
        match self {
            Stage::Load => None,
            Stage::Select => Some(Stage::Load),
            Stage::Work => Some(Stage::Select),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client session lifecycle.
///
/// ```text
/// Idle → AwaitingLoadAck → ReadyForSelect → AwaitingSelectResponse
///      → AwaitingWorkResponse (once per planned file) → Done
/// ```
///
/// `Closed` is entered from any state once a close frame is sent or received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingLoadAck,
    ReadyForSelect,
    AwaitingSelectResponse,
    AwaitingWorkResponse,
    Done,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingLoadAck => "awaiting load ack",
            SessionState::ReadyForSelect => "ready for select",
            SessionState::AwaitingSelectResponse => "awaiting select response",
            SessionState::AwaitingWorkResponse => "awaiting work response",
            SessionState::Done => "done",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_wire_names() {
        assert_eq!(serde_json::to_string(&Stage::Select).unwrap(), "\"select\"");
        let stage: Stage = serde_json::from_str("\"work\"").unwrap();
        assert_eq!(stage, Stage::Work);
        assert!(serde_json::from_str::<Stage>("\"LOAD\"").is_err());
    }

    #[test]
    fn test_prerequisites_follow_order() {
        assert_eq!(Stage::Load.prerequisite(), None);
        assert_eq!(Stage::Select.prerequisite(), Some(Stage::Load));
        assert_eq!(Stage::Work.prerequisite(), Some(Stage::Select));
    }
}
