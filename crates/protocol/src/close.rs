use std::fmt;

/// Reasons a session connection is closed, with their websocket codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Normal,
    GoingAway,
    Abnormal,
    InternalError,
}

impl CloseReason {
    pub fn code(self) -> u16 {
        match self {
            CloseReason::Normal => 1000,
            CloseReason::GoingAway => 1001,
            CloseReason::Abnormal => 1006,
            CloseReason::InternalError => 1011,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1000 => Some(CloseReason::Normal),
            1001 => Some(CloseReason::GoingAway),
            1006 => Some(CloseReason::Abnormal),
            1011 => Some(CloseReason::InternalError),
            _ => None,
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CloseReason::Normal => "normal closure",
            CloseReason::GoingAway => "going away",
            CloseReason::Abnormal => "abnormal closure",
            CloseReason::InternalError => "internal error",
        };
        write!(f, "{name} ({})", self.code())
    }
}
