use archival_architecture::repository::DBRepository;
use async_trait::async_trait;

use crate::model::entity::FileReference;

#[async_trait]
pub trait FileReferenceRepo: DBRepository<FileReference> + Send + Sync {
    async fn get_by_checksum_and_storage(
        &self,
        checksum: &str,
        storage: &str,
    ) -> anyhow::Result<Option<FileReference>>;

    /// Every stored copy of a checksum.
    async fn get_all_by_checksum(&self, checksum: &str) -> anyhow::Result<Vec<FileReference>>;
}
