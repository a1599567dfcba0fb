use serde::{Deserialize, Serialize};

use crate::model::entity::RequestResultInfo;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupStatus {
    /// The group was accepted and its requests are being handled.
    Granted,
    /// The group was refused as a whole.
    Denied,
    /// Every request of the group succeeded.
    Success,
    /// At least one request of the group failed.
    Error,
}

/// Message published to the requester of a group.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupResult {
    pub group_id: String,
    pub status: GroupStatus,
    /// One entry per request of the group, only set on completion.
    pub results: Vec<RequestResultInfo>,
    pub message: Option<String>,
}

impl GroupResult {
    pub fn granted(group_id: &str) -> Self {
        Self {
            group_id: group_id.to_owned(),
            status: GroupStatus::Granted,
            results: vec![],
            message: None,
        }
    }

    pub fn denied(group_id: &str, message: impl Into<String>) -> Self {
        Self {
            group_id: group_id.to_owned(),
            status: GroupStatus::Denied,
            results: vec![],
            message: Some(message.into()),
        }
    }

    pub fn completed(group_id: &str, results: Vec<RequestResultInfo>) -> Self {
        let status = if results.iter().any(|r| r.error_cause.is_some()) {
            GroupStatus::Error
        } else {
            GroupStatus::Success
        };
        Self {
            group_id: group_id.to_owned(),
            status,
            results,
            message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, GroupStatus::Success | GroupStatus::Error)
    }
}
