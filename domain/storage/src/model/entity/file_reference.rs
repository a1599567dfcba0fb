use std::collections::BTreeSet;

use archival_architecture::model::AggregateRoot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One physical copy of one file on one storage location.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileReference {
    pub id: Uuid,
    pub meta_info: FileReferenceMetaInfo,
    pub location: FileLocation,
    /// Business entities depending on the file staying stored.
    pub owners: BTreeSet<String>,
    pub storage_date: DateTime<Utc>,
}

impl AggregateRoot for FileReference {
    type Id = Uuid;
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileReferenceMetaInfo {
    pub checksum: String,
    pub algorithm: String,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: u64,
    pub height: Option<u32>,
    pub width: Option<u32>,
    /// Domain tag, e.g. RAWDATA or THUMBNAIL.
    pub r#type: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileLocation {
    pub storage: String,
    pub url: String,
}

impl FileReference {
    pub fn new(
        meta_info: FileReferenceMetaInfo,
        location: FileLocation,
        owners: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            meta_info,
            location,
            owners: owners.into_iter().collect(),
            storage_date: Utc::now(),
        }
    }

    pub fn checksum(&self) -> &str {
        &self.meta_info.checksum
    }

    pub fn storage(&self) -> &str {
        &self.location.storage
    }

    /// Returns whether any owner was new.
    pub fn add_owners<'a>(&mut self, owners: impl IntoIterator<Item = &'a String>) -> bool {
        let before = self.owners.len();
        self.owners.extend(owners.into_iter().cloned());
        self.owners.len() != before
    }

    pub fn remove_owner(&mut self, owner: &str) -> bool {
        self.owners.remove(owner)
    }

    pub fn is_orphan(&self) -> bool {
        self.owners.is_empty()
    }
}
