use std::collections::BTreeSet;

use archival_architecture::model::AggregateRoot;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::FileReferenceMetaInfo;
use crate::{
    exception::{FileRequestException, FileRequestResult},
    model::vo::{FileRequestStatus, FileRequestType},
};

/// A pending intention to mutate the file references of one `(checksum, storage)`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileRequest {
    pub id: Uuid,
    pub checksum: String,
    pub storage: String,
    pub owners: BTreeSet<String>,
    /// Every group waiting for this request, merged requests carry several.
    pub group_ids: BTreeSet<String>,
    pub status: FileRequestStatus,
    pub error_cause: Option<String>,
    /// Known for storage, copy and reference requests.
    pub meta_info: Option<FileReferenceMetaInfo>,
    pub details: RequestDetails,
    pub session_owner: Option<String>,
    pub session: Option<String>,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AggregateRoot for FileRequest {
    type Id = Uuid;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum RequestDetails {
    Storage {
        origin_url: String,
        sub_directory: Option<String>,
    },
    Deletion {
        force_delete: bool,
    },
    Copy {
        source_storage: String,
        sub_directory: Option<String>,
    },
    Reference {
        url: String,
    },
    Availability {
        /// Location the copy is restored from.
        source_storage: String,
        /// End of the cache retention of the restored copy.
        expires_at: DateTime<Utc>,
    },
}

impl RequestDetails {
    pub fn r#type(&self) -> FileRequestType {
        match self {
            Self::Storage { .. } => FileRequestType::Storage,
            Self::Deletion { .. } => FileRequestType::Deletion,
            Self::Copy { .. } => FileRequestType::Copy,
            Self::Reference { .. } => FileRequestType::Reference,
            Self::Availability { .. } => FileRequestType::Availability,
        }
    }
}

impl FileRequest {
    pub fn new(
        checksum: impl Into<String>,
        storage: impl Into<String>,
        group_id: &str,
        details: RequestDetails,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            checksum: checksum.into(),
            storage: storage.into(),
            owners: BTreeSet::new(),
            group_ids: BTreeSet::from([group_id.to_owned()]),
            status: FileRequestStatus::Pending,
            error_cause: None,
            meta_info: None,
            details,
            session_owner: None,
            session: None,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn r#type(&self) -> FileRequestType {
        self.details.r#type()
    }

    pub fn sub_directory(&self) -> Option<&str> {
        match &self.details {
            RequestDetails::Storage { sub_directory, .. }
            | RequestDetails::Copy { sub_directory, .. } => sub_directory.as_deref(),
            _ => None,
        }
    }

    /// Path of the file inside the destination storage.
    pub fn destination_path(&self) -> String {
        match self.sub_directory() {
            Some(dir) => format!("{}/{}", dir.trim_matches('/'), self.checksum),
            None => self.checksum.to_owned(),
        }
    }

    /// Location whose availability gates the dispatch.
    pub fn blocking_storage(&self) -> &str {
        match &self.details {
            RequestDetails::Availability { source_storage, .. } => source_storage,
            _ => &self.storage,
        }
    }

    /// Keep the later of both cache retentions.
    pub fn extend_retention(&mut self, until: DateTime<Utc>) {
        if let RequestDetails::Availability { expires_at, .. } = &mut self.details {
            if until > *expires_at {
                *expires_at = until;
            }
        }
    }

    pub fn force_delete(&self) -> bool {
        matches!(self.details, RequestDetails::Deletion { force_delete: true })
    }

    /// Move to `to`, refusing any step the state machine doesn't allow.
    pub fn transition(&mut self, to: FileRequestStatus) -> FileRequestResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(FileRequestException::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn fail(&mut self, cause: impl Into<String>) -> FileRequestResult<()> {
        self.transition(FileRequestStatus::Error)?;
        self.error_cause = Some(cause.into());
        Ok(())
    }

    /// Add the owners and group of an equivalent request.
    pub fn merge<'a>(&mut self, owners: impl IntoIterator<Item = &'a String>, group_id: &str) {
        self.owners.extend(owners.into_iter().cloned());
        self.group_ids.insert(group_id.to_owned());
        self.updated_at = Utc::now();
    }

    /// A deletion merged with a forced one becomes forced.
    pub fn force(&mut self) {
        if let RequestDetails::Deletion { force_delete } = &mut self.details {
            *force_delete = true;
        }
    }

    /// A fresh pending request doing the same work for `group_id`.
    pub fn retry_clone(&self, group_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            group_ids: BTreeSet::from([group_id.to_owned()]),
            status: FileRequestStatus::Pending,
            error_cause: None,
            retry_count: self.retry_count + 1,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Running for longer than `threshold` without a worker result.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.status == FileRequestStatus::Running && now - self.updated_at > threshold
    }
}
