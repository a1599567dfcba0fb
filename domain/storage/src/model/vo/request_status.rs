use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileRequestStatus {
    /// Accepted, not resolved yet.
    #[default]
    Pending,
    /// Destination temporarily unavailable, waiting for the sweep.
    Delayed,
    /// Ready to be dispatched to a storage worker.
    ToDo,
    /// Dispatched, waiting for the worker result.
    Running,
    Error,
    Success,
}

impl FileRequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error | Self::Success)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether the state machine allows going from `self` to `to`.
    pub fn can_transition_to(&self, to: Self) -> bool {
        use FileRequestStatus::*;
        matches!(
            (self, to),
            (Pending, ToDo | Error | Delayed | Success)
                | (Delayed, ToDo | Error)
                | (ToDo, Running | Delayed | Error | Success)
                | (Running, Success | Error)
        )
    }
}

impl fmt::Display for FileRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Delayed => "DELAYED",
            Self::ToDo => "TO_DO",
            Self::Running => "RUNNING",
            Self::Error => "ERROR",
            Self::Success => "SUCCESS",
        };
        f.write_str(s)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileRequestType {
    Storage,
    Deletion,
    Copy,
    Reference,
    /// Restoration of a file to the cache.
    Availability,
}

impl fmt::Display for FileRequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Storage => "STORAGE",
            Self::Deletion => "DELETION",
            Self::Copy => "COPY",
            Self::Reference => "REFERENCE",
            Self::Availability => "AVAILABILITY",
        };
        f.write_str(s)
    }
}
