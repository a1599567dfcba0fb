use archival_architecture::repository::DBRepository;
use async_trait::async_trait;
use uuid::Uuid;

use crate::model::entity::Aip;

#[async_trait]
pub trait AipRepo: DBRepository<Aip> + Send + Sync {
    /// The AIP whose storage or deletion is correlated with `group_id`.
    async fn get_by_group_id(&self, group_id: &str) -> anyhow::Result<Option<Aip>>;

    async fn get_all_by_sip(&self, sip_id: Uuid) -> anyhow::Result<Vec<Aip>>;
}
