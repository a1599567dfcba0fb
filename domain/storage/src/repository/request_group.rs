use archival_architecture::repository::DBRepository;
use async_trait::async_trait;

use crate::model::entity::RequestGroup;

#[async_trait]
pub trait RequestGroupRepo: DBRepository<RequestGroup> + Send + Sync {
    /// Oldest first, at most `limit`.
    async fn get_unpublished(&self, limit: usize) -> anyhow::Result<Vec<RequestGroup>>;
}
