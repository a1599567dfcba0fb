use std::collections::BTreeSet;

use domain_storage::{
    exception::{FileRequestException, FileRequestResult},
    model::{
        entity::StorageLocation,
        vo::{FileToAllocate, StorageTarget},
    },
    service::AllocationStrategy,
};

use super::highest_priority;

/// Single destination: the enabled location of highest priority.
///
/// Quicklooks go to the best online location instead, even when the bulk
/// location differs. Other online mandatory files keep the bulk location and
/// get an online one appended by the shared online rule.
#[derive(Default)]
pub struct DefaultAllocationStrategy;

impl DefaultAllocationStrategy {
    pub const ID: &'static str = "default";
}

impl AllocationStrategy for DefaultAllocationStrategy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn select(
        &self,
        file: &FileToAllocate,
        locations: &[StorageLocation],
    ) -> FileRequestResult<BTreeSet<StorageTarget>> {
        let chosen = if file.quicklook {
            highest_priority(locations, true).or_else(|| highest_priority(locations, false))
        } else {
            highest_priority(locations, false)
        };
        let location = chosen.ok_or_else(|| FileRequestException::NoStorageResolved {
            checksum: file.checksum.to_owned(),
            reason: "no active storage location".to_owned(),
        })?;
        Ok(BTreeSet::from([StorageTarget::new(&location.id)]))
    }
}
