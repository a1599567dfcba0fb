use dashmap::DashMap;
use domain_storage::{
    model::{
        entity::FileRequest,
        vo::{FileRequestStatus, FileRequestType},
    },
    repository::FileRequestRepo,
};
use uuid::Uuid;

use crate::infrastructure::database::{MemoryRepository, Row};

impl Row for FileRequest {
    const NAME: &'static str = "file request";

    fn key(&self) -> Uuid {
        self.id
    }

    fn table(repo: &MemoryRepository) -> &DashMap<Uuid, Self> {
        &repo.requests
    }
}

fn oldest_first(mut requests: Vec<FileRequest>) -> Vec<FileRequest> {
    requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    requests
}

#[async_trait::async_trait]
impl FileRequestRepo for MemoryRepository {
    async fn get_active(
        &self,
        checksum: &str,
        storage: &str,
        r#type: FileRequestType,
    ) -> anyhow::Result<Option<FileRequest>> {
        let active = self.select(|r: &FileRequest| {
            r.checksum == checksum
                && r.storage == storage
                && r.r#type() == r#type
                && r.status.is_active()
        });
        Ok(oldest_first(active).into_iter().next())
    }

    async fn get_all_by_group(&self, group_id: &str) -> anyhow::Result<Vec<FileRequest>> {
        Ok(oldest_first(
            self.select(|r: &FileRequest| r.group_ids.contains(group_id)),
        ))
    }

    async fn get_all_by_status(
        &self,
        status: FileRequestStatus,
        limit: usize,
    ) -> anyhow::Result<Vec<FileRequest>> {
        let mut requests = oldest_first(self.select(|r: &FileRequest| r.status == status));
        requests.truncate(limit);
        Ok(requests)
    }

    async fn get_errors_by_owners(&self, owners: &[String]) -> anyhow::Result<Vec<FileRequest>> {
        Ok(oldest_first(self.select(|r: &FileRequest| {
            r.status == FileRequestStatus::Error && owners.iter().any(|o| r.owners.contains(o))
        })))
    }
}
