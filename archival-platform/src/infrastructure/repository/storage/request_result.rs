use dashmap::DashMap;
use domain_storage::{model::entity::RequestResultInfo, repository::RequestResultInfoRepo};
use uuid::Uuid;

use crate::infrastructure::database::{MemoryRepository, Row};

impl Row for RequestResultInfo {
    const NAME: &'static str = "request result";

    fn key(&self) -> Uuid {
        self.id
    }

    fn table(repo: &MemoryRepository) -> &DashMap<Uuid, Self> {
        &repo.results
    }
}

#[async_trait::async_trait]
impl RequestResultInfoRepo for MemoryRepository {
    async fn get_all_by_group(&self, group_id: &str) -> anyhow::Result<Vec<RequestResultInfo>> {
        Ok(self.select(|r: &RequestResultInfo| r.group_id == group_id))
    }

    async fn exists(&self, group_id: &str, request_id: Uuid) -> anyhow::Result<bool> {
        Ok(self
            .results
            .iter()
            .any(|r| r.group_id == group_id && r.request_id == request_id))
    }

    async fn delete_all_by_group(&self, group_id: &str) -> anyhow::Result<()> {
        self.results.retain(|_, r| r.group_id != group_id);
        Ok(())
    }
}
