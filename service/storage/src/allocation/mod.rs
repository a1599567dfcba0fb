//! Built-in allocation strategies.
mod default;
mod metadata;
mod property;
mod protocol;
mod registry;
mod replicate;

#[rustfmt::skip]
pub use {
    default::DefaultAllocationStrategy,
    metadata::MetadataAllocationStrategy,
    property::PropertyMappingAllocationStrategy,
    protocol::ProtocolAllocationStrategy,
    registry::{AllocationStrategyRegistry, StrategyConstructor},
    replicate::ReplicateAllocationStrategy,
};

use domain_storage::{
    exception::{FileRequestException, FileRequestResult},
    model::{
        entity::StorageLocation,
        vo::{FileToAllocate, StorageTarget},
    },
};

/// Enabled location with the best priority, ties broken by id.
fn highest_priority(locations: &[StorageLocation], online_only: bool) -> Option<&StorageLocation> {
    locations
        .iter()
        .filter(|l| l.enabled && (l.online || !online_only))
        .min_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)))
}

/// `storage` as a destination, if it's one of the enabled locations.
fn resolve(
    file: &FileToAllocate,
    locations: &[StorageLocation],
    storage: &str,
    sub_directory: Option<String>,
) -> FileRequestResult<StorageTarget> {
    if !locations.iter().any(|l| l.enabled && l.id == storage) {
        return Err(FileRequestException::NoStorageResolved {
            checksum: file.checksum.to_owned(),
            reason: format!("storage <{storage}> is not an active location"),
        });
    }
    Ok(StorageTarget::with_sub_directory(storage, sub_directory))
}

fn parse_options<T: serde::de::DeserializeOwned>(
    id: &str,
    options: &serde_json::Value,
) -> anyhow::Result<T> {
    serde_json::from_value(options.clone())
        .map_err(|e| anyhow::anyhow!("Invalid options for allocation strategy <{id}>: {e}"))
}
