use archival_architecture::repository::DBRepository;
use async_trait::async_trait;

use crate::model::entity::StorageLocation;

#[async_trait]
pub trait StorageLocationRepo: DBRepository<StorageLocation> + Send + Sync {
    /// Enabled locations, by ascending priority value.
    async fn get_all_enabled(&self) -> anyhow::Result<Vec<StorageLocation>>;
}
