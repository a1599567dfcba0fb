use dashmap::DashMap;
use domain_storage::{model::entity::StorageLocation, repository::StorageLocationRepo};

use crate::infrastructure::database::{MemoryRepository, Row};

impl Row for StorageLocation {
    const NAME: &'static str = "storage location";

    fn key(&self) -> String {
        self.id.to_owned()
    }

    fn table(repo: &MemoryRepository) -> &DashMap<String, Self> {
        &repo.locations
    }
}

#[async_trait::async_trait]
impl StorageLocationRepo for MemoryRepository {
    async fn get_all_enabled(&self) -> anyhow::Result<Vec<StorageLocation>> {
        let mut locations = self.select(|l: &StorageLocation| l.enabled);
        locations.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        Ok(locations)
    }
}
