use std::collections::BTreeSet;

use archival_architecture::model::AggregateRoot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FileLocation, FileReference, FileReferenceMetaInfo};
use crate::command::CACHE_STORAGE;

/// A temporary copy of a file restored for reading, keyed by checksum.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheFile {
    pub checksum: String,
    pub url: String,
    pub meta_info: FileReferenceMetaInfo,
    pub owners: BTreeSet<String>,
    pub expires_at: DateTime<Utc>,
}

impl AggregateRoot for CacheFile {
    type Id = String;
}

impl CacheFile {
    pub fn new(
        meta_info: FileReferenceMetaInfo,
        url: impl Into<String>,
        owners: BTreeSet<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            checksum: meta_info.checksum.to_owned(),
            url: url.into(),
            meta_info,
            owners,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Never shortens the retention.
    pub fn extend(&mut self, until: DateTime<Utc>) {
        self.expires_at = self.expires_at.max(until);
    }

    /// The copy, as reported to the groups asking for it.
    pub fn to_reference(&self) -> FileReference {
        FileReference::new(
            self.meta_info.clone(),
            FileLocation {
                storage: CACHE_STORAGE.to_owned(),
                url: self.url.to_owned(),
            },
            self.owners.iter().cloned(),
        )
    }
}
