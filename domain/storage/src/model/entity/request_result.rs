use std::collections::BTreeSet;

use archival_architecture::model::AggregateRoot;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{FileReference, FileRequest};
use crate::model::vo::{FileRequestStatus, FileRequestType};

/// Outcome of one request, reported to one group.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestResultInfo {
    pub id: Uuid,
    pub group_id: String,
    pub request_id: Uuid,
    pub request_type: FileRequestType,
    pub checksum: String,
    pub storage: String,
    pub store_path: Option<String>,
    pub owners: BTreeSet<String>,
    pub result_file: Option<FileReference>,
    pub error_cause: Option<String>,
}

impl AggregateRoot for RequestResultInfo {
    type Id = Uuid;
}

impl RequestResultInfo {
    /// Result of a terminal request for `group_id`.
    pub fn new(group_id: &str, request: &FileRequest, result_file: Option<&FileReference>) -> Self {
        let error_cause = match request.status {
            FileRequestStatus::Error => Some(
                request
                    .error_cause
                    .clone()
                    .unwrap_or_else(|| "Unknown error.".to_owned()),
            ),
            _ => None,
        };
        let store_path = match result_file {
            Some(file) => Some(file.location.url.to_owned()),
            None => request.sub_directory().map(str::to_owned),
        };
        Self {
            id: Uuid::new_v4(),
            group_id: group_id.to_owned(),
            request_id: request.id,
            request_type: request.r#type(),
            checksum: request.checksum.to_owned(),
            storage: request.storage.to_owned(),
            store_path,
            owners: request.owners.clone(),
            result_file: result_file.cloned(),
            error_cause,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_cause.is_none()
    }
}
