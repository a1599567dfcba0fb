use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a submission package, following its AIP.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SipState {
    #[default]
    Created,
    AipCreated,
    Stored,
    StoreError,
    Deleted,
}

/// Lifecycle of an archival package.
///
/// Every `*_GRANTED` state waits for the completion of one request group,
/// which resolves it to the next state or to the paired error state.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AipState {
    #[default]
    Created,
    StorageRequestGranted,
    StorageRequestDenied,
    Stored,
    StorageError,
    ToBeDeleted,
    DeletionRequestGranted,
    DeletionRequestDenied,
    Deleted,
}

impl AipState {
    pub fn can_transition_to(&self, to: Self) -> bool {
        use AipState::*;
        matches!(
            (self, to),
            (
                Created | StorageRequestDenied | StorageError,
                StorageRequestGranted | StorageRequestDenied
            ) | (StorageRequestGranted, Stored | StorageError)
                | (
                    Created | Stored | StorageRequestDenied | StorageError | DeletionRequestDenied,
                    ToBeDeleted
                )
                | (ToBeDeleted, DeletionRequestGranted | DeletionRequestDenied)
                | (DeletionRequestGranted, Deleted | DeletionRequestDenied)
        )
    }

    /// States a storage request can be issued from.
    pub fn can_request_storage(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::StorageRequestDenied | Self::StorageError
        )
    }
}

impl fmt::Display for AipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::StorageRequestGranted => "STORAGE_REQUEST_GRANTED",
            Self::StorageRequestDenied => "STORAGE_REQUEST_DENIED",
            Self::Stored => "STORED",
            Self::StorageError => "STORAGE_ERROR",
            Self::ToBeDeleted => "TO_BE_DELETED",
            Self::DeletionRequestGranted => "DELETION_REQUEST_GRANTED",
            Self::DeletionRequestDenied => "DELETION_REQUEST_DENIED",
            Self::Deleted => "DELETED",
        };
        f.write_str(s)
    }
}
