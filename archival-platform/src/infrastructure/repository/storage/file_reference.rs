use dashmap::DashMap;
use domain_storage::{model::entity::FileReference, repository::FileReferenceRepo};
use uuid::Uuid;

use crate::infrastructure::database::{MemoryRepository, Row};

impl Row for FileReference {
    const NAME: &'static str = "file reference";

    fn key(&self) -> Uuid {
        self.id
    }

    fn table(repo: &MemoryRepository) -> &DashMap<Uuid, Self> {
        &repo.references
    }
}

#[async_trait::async_trait]
impl FileReferenceRepo for MemoryRepository {
    async fn get_by_checksum_and_storage(
        &self,
        checksum: &str,
        storage: &str,
    ) -> anyhow::Result<Option<FileReference>> {
        Ok(self
            .select(|f: &FileReference| f.checksum() == checksum && f.storage() == storage)
            .into_iter()
            .next())
    }

    async fn get_all_by_checksum(&self, checksum: &str) -> anyhow::Result<Vec<FileReference>> {
        Ok(self.select(|f: &FileReference| f.checksum() == checksum))
    }
}
