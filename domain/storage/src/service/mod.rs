mod allocation;
mod data_storage;
mod dispatch;
mod group;
mod storage_location;

#[rustfmt::skip]
pub use {
    allocation::{ensure_online, AllocationStrategy},
    data_storage::DataStorageService,
    dispatch::RequestDispatchService,
    group::RequestGroupService,
    storage_location::StorageLocationService,
};
