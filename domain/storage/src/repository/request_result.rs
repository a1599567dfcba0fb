use archival_architecture::repository::DBRepository;
use async_trait::async_trait;
use uuid::Uuid;

use crate::model::entity::RequestResultInfo;

#[async_trait]
pub trait RequestResultInfoRepo: DBRepository<RequestResultInfo> + Send + Sync {
    async fn get_all_by_group(&self, group_id: &str) -> anyhow::Result<Vec<RequestResultInfo>>;

    async fn exists(&self, group_id: &str, request_id: Uuid) -> anyhow::Result<bool>;

    async fn delete_all_by_group(&self, group_id: &str) -> anyhow::Result<()>;
}
