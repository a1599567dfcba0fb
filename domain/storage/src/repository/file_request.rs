use archival_architecture::repository::DBRepository;
use async_trait::async_trait;

use crate::model::{
    entity::FileRequest,
    vo::{FileRequestStatus, FileRequestType},
};

#[async_trait]
pub trait FileRequestRepo: DBRepository<FileRequest> + Send + Sync {
    /// The single non terminal request of a `(checksum, storage, type)` tuple.
    async fn get_active(
        &self,
        checksum: &str,
        storage: &str,
        r#type: FileRequestType,
    ) -> anyhow::Result<Option<FileRequest>>;

    async fn get_all_by_group(&self, group_id: &str) -> anyhow::Result<Vec<FileRequest>>;

    /// Oldest first, at most `limit`.
    async fn get_all_by_status(
        &self,
        status: FileRequestStatus,
        limit: usize,
    ) -> anyhow::Result<Vec<FileRequest>>;

    /// Failed requests owned by any of `owners`.
    async fn get_errors_by_owners(&self, owners: &[String]) -> anyhow::Result<Vec<FileRequest>>;
}
