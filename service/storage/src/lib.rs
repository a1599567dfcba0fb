pub mod allocation;
mod dispatch;
mod group;
mod lock;
mod storage_location;

#[rustfmt::skip]
pub use {
    dispatch::RequestDispatchServiceImpl,
    group::{RequestGroupServiceImpl, GROUP_EXPIRED_CAUSE},
    lock::KeyedLock,
    storage_location::StorageLocationServiceImpl,
};
