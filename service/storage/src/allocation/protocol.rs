use std::collections::{BTreeSet, HashMap};

use domain_storage::{
    exception::{FileRequestException, FileRequestResult},
    model::{
        entity::StorageLocation,
        vo::{FileToAllocate, StorageTarget},
    },
    service::AllocationStrategy,
};
use serde::Deserialize;
use url::Url;

use super::resolve;

/// Destination picked from the scheme of the declared origin url.
pub struct ProtocolAllocationStrategy {
    options: ProtocolOptions,
}

#[derive(Deserialize, Clone)]
pub struct ProtocolOptions {
    /// Lowercase scheme to storage location id.
    pub schemes: HashMap<String, String>,
    #[serde(default)]
    pub default: Option<String>,
}

impl ProtocolAllocationStrategy {
    pub const ID: &'static str = "protocol";

    pub fn new(options: ProtocolOptions) -> Self {
        Self { options }
    }
}

impl AllocationStrategy for ProtocolAllocationStrategy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn select(
        &self,
        file: &FileToAllocate,
        locations: &[StorageLocation],
    ) -> FileRequestResult<BTreeSet<StorageTarget>> {
        let scheme = Url::parse(&file.origin_url)
            .map_err(|e| FileRequestException::InvalidUrl {
                url: file.origin_url.to_owned(),
                reason: e.to_string(),
            })?
            .scheme()
            .to_ascii_lowercase();
        let storage = self
            .options
            .schemes
            .get(&scheme)
            .or(self.options.default.as_ref())
            .ok_or_else(|| FileRequestException::NoStorageResolved {
                checksum: file.checksum.to_owned(),
                reason: format!("no storage for scheme <{scheme}>"),
            })?;
        Ok(BTreeSet::from([resolve(file, locations, storage, None)?]))
    }
}
