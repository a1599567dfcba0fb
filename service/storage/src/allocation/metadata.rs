use std::collections::BTreeSet;

use domain_storage::{
    exception::{FileRequestException, FileRequestResult},
    model::{
        entity::StorageLocation,
        vo::{FileToAllocate, StorageTarget},
    },
    service::AllocationStrategy,
};
use serde::Deserialize;

use super::resolve;

/// Destinations listed in a storage annotation of the package metadata.
///
/// The annotation is a list of `{"storage": .., "subPath": ..}` found under
/// `key` in the package metadata.
pub struct MetadataAllocationStrategy {
    key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MetadataOptions {
    #[serde(default = "MetadataOptions::default_key")]
    key: String,
}

impl MetadataOptions {
    fn default_key() -> String {
        "storage".to_owned()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageAnnotation {
    #[serde(alias = "pluginId")]
    storage: String,
    #[serde(default, alias = "directory")]
    sub_path: Option<String>,
}

impl MetadataAllocationStrategy {
    pub const ID: &'static str = "metadata";

    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub(crate) fn from_options(options: MetadataOptions) -> Self {
        Self::new(options.key)
    }
}

impl AllocationStrategy for MetadataAllocationStrategy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn select(
        &self,
        file: &FileToAllocate,
        locations: &[StorageLocation],
    ) -> FileRequestResult<BTreeSet<StorageTarget>> {
        let malformed = |reason: String| FileRequestException::MalformedAnnotation {
            checksum: file.checksum.to_owned(),
            reason,
        };
        let annotation = file
            .metadata
            .get(&self.key)
            .ok_or_else(|| malformed(format!("no <{}> annotation", self.key)))?;
        let entries: Vec<StorageAnnotation> =
            serde_json::from_value(annotation.clone()).map_err(|e| malformed(e.to_string()))?;
        if entries.is_empty() {
            return Err(malformed("annotation lists no storage".to_owned()));
        }
        entries
            .into_iter()
            .map(|entry| resolve(file, locations, &entry.storage, entry.sub_path))
            .collect()
    }
}
