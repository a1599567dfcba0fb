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

/// Every file goes to the same fixed set of locations.
///
/// Configured locations that are currently disabled are left out.
pub struct ReplicateAllocationStrategy {
    storages: Vec<String>,
}

#[derive(Deserialize)]
pub(crate) struct ReplicateOptions {
    storages: Vec<String>,
}

impl ReplicateAllocationStrategy {
    pub const ID: &'static str = "replicate";

    pub fn new(storages: Vec<String>) -> Self {
        Self { storages }
    }

    pub(crate) fn from_options(options: ReplicateOptions) -> Self {
        Self::new(options.storages)
    }
}

impl AllocationStrategy for ReplicateAllocationStrategy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn select(
        &self,
        file: &FileToAllocate,
        locations: &[StorageLocation],
    ) -> FileRequestResult<BTreeSet<StorageTarget>> {
        let targets: BTreeSet<_> = self
            .storages
            .iter()
            .filter(|s| locations.iter().any(|l| l.enabled && &l.id == *s))
            .map(StorageTarget::new)
            .collect();
        if targets.is_empty() {
            return Err(FileRequestException::NoStorageResolved {
                checksum: file.checksum.to_owned(),
                reason: format!("none of {:?} is active", self.storages),
            });
        }
        Ok(targets)
    }
}
