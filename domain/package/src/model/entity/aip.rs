use archival_architecture::model::AggregateRoot;
use chrono::{DateTime, Utc};
use domain_storage::{
    command::{DeletionRequest, FileOperationRequest},
    model::{entity::RequestResultInfo, vo::FileRequestType},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{PackageFile, Sip};
use crate::{
    exception::{PackageException, PackageResult},
    model::vo::AipState,
};

/// The archived form of a SIP, owner of the file references of its files.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Aip {
    pub id: Uuid,
    pub sip_id: Uuid,
    pub provider_id: String,
    pub session_owner: String,
    pub session: String,
    pub state: AipState,
    pub files: Vec<PackageFile>,
    pub metadata: Value,
    /// Where the files are stored, filled from group results.
    pub locations: Vec<AipLocation>,
    pub storage_group_id: Option<String>,
    pub deletion_group_id: Option<String>,
    pub error_message: Option<String>,
    pub last_update: DateTime<Utc>,
}

impl AggregateRoot for Aip {
    type Id = Uuid;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AipLocation {
    pub checksum: String,
    pub storage: String,
    pub url: String,
}

impl Aip {
    pub fn from_sip(sip: &Sip) -> Self {
        Self {
            id: Uuid::new_v4(),
            sip_id: sip.id,
            provider_id: sip.provider_id.to_owned(),
            session_owner: sip.session_owner.to_owned(),
            session: sip.session.to_owned(),
            state: AipState::Created,
            files: sip.files.clone(),
            metadata: sip.metadata.clone(),
            locations: vec![],
            storage_group_id: None,
            deletion_group_id: None,
            error_message: None,
            last_update: Utc::now(),
        }
    }

    /// Owner id of the file references of this package.
    pub fn owner(&self) -> String {
        self.id.to_string()
    }

    pub fn transition(&mut self, to: AipState) -> PackageResult<()> {
        if !self.state.can_transition_to(to) {
            return Err(PackageException::InvalidTransition {
                id: self.id,
                from: self.state,
                to,
            });
        }
        self.state = to;
        self.last_update = Utc::now();
        Ok(())
    }

    pub fn storage_requests(&self) -> Vec<FileOperationRequest> {
        let owner = self.owner();
        self.files
            .iter()
            .map(|f| {
                FileOperationRequest::Storage(f.storage_request(
                    &owner,
                    &self.session_owner,
                    &self.session,
                    &self.metadata,
                ))
            })
            .collect()
    }

    /// One deletion per stored copy.
    pub fn deletion_requests(&self, force_delete: bool) -> Vec<FileOperationRequest> {
        self.locations
            .iter()
            .map(|l| {
                FileOperationRequest::Deletion(DeletionRequest {
                    checksum: l.checksum.to_owned(),
                    storage: l.storage.to_owned(),
                    owner: self.owner(),
                    force_delete,
                    session_owner: self.session_owner.to_owned(),
                    session: self.session.to_owned(),
                })
            })
            .collect()
    }

    /// Apply the successful results of a storage or deletion group.
    pub fn record_results(&mut self, results: &[RequestResultInfo]) {
        for result in results.iter().filter(|r| r.is_success()) {
            match result.request_type {
                FileRequestType::Storage | FileRequestType::Reference => {
                    let Some(file) = &result.result_file else {
                        continue;
                    };
                    let location = AipLocation {
                        checksum: result.checksum.to_owned(),
                        storage: result.storage.to_owned(),
                        url: file.location.url.to_owned(),
                    };
                    if !self.locations.contains(&location) {
                        self.locations.push(location);
                    }
                }
                FileRequestType::Deletion => self
                    .locations
                    .retain(|l| !(l.checksum == result.checksum && l.storage == result.storage)),
                FileRequestType::Copy | FileRequestType::Availability => {}
            }
        }
    }

    /// First error causes of a group, for display.
    pub fn summarize_errors(results: &[RequestResultInfo]) -> Option<String> {
        let causes: Vec<_> = results
            .iter()
            .filter_map(|r| {
                r.error_cause
                    .as_ref()
                    .map(|cause| format!("{} on {}: {cause}", r.checksum, r.storage))
            })
            .collect();
        match causes.len() {
            0 => None,
            n if n <= 3 => Some(causes.join("; ")),
            n => Some(format!("{} and {} more errors", causes[..3].join("; "), n - 3)),
        }
    }
}
