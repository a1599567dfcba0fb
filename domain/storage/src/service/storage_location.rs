use async_trait::async_trait;

use crate::{exception::FileRequestResult, model::entity::StorageLocation};

#[async_trait]
pub trait StorageLocationService: Send + Sync {
    /// Enabled locations by priority.
    async fn list_active(&self) -> FileRequestResult<Vec<StorageLocation>>;

    async fn get(&self, id: &str) -> FileRequestResult<Option<StorageLocation>>;

    /// Disabling a location delays the new requests targeting it.
    async fn set_enabled(&self, id: &str, enabled: bool) -> FileRequestResult<()>;
}
