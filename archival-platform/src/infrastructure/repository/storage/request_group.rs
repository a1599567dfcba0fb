use dashmap::DashMap;
use domain_storage::{model::entity::RequestGroup, repository::RequestGroupRepo};

use crate::infrastructure::database::{MemoryRepository, Row};

impl Row for RequestGroup {
    const NAME: &'static str = "request group";

    fn key(&self) -> String {
        self.id.to_owned()
    }

    fn table(repo: &MemoryRepository) -> &DashMap<String, Self> {
        &repo.groups
    }
}

#[async_trait::async_trait]
impl RequestGroupRepo for MemoryRepository {
    async fn get_unpublished(&self, limit: usize) -> anyhow::Result<Vec<RequestGroup>> {
        let mut groups = self.select(|g: &RequestGroup| !g.published);
        groups.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        groups.truncate(limit);
        Ok(groups)
    }
}
