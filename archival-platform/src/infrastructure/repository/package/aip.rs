use dashmap::DashMap;
use domain_package::{model::entity::Aip, repository::AipRepo};
use uuid::Uuid;

use crate::infrastructure::database::{MemoryRepository, Row};

impl Row for Aip {
    const NAME: &'static str = "AIP";

    fn key(&self) -> Uuid {
        self.id
    }

    fn table(repo: &MemoryRepository) -> &DashMap<Uuid, Self> {
        &repo.aips
    }
}

#[async_trait::async_trait]
impl AipRepo for MemoryRepository {
    async fn get_by_group_id(&self, group_id: &str) -> anyhow::Result<Option<Aip>> {
        Ok(self
            .select(|a: &Aip| {
                a.storage_group_id.as_deref() == Some(group_id)
                    || a.deletion_group_id.as_deref() == Some(group_id)
            })
            .into_iter()
            .next())
    }

    async fn get_all_by_sip(&self, sip_id: Uuid) -> anyhow::Result<Vec<Aip>> {
        let mut aips = self.select(|a: &Aip| a.sip_id == sip_id);
        aips.sort_by(|a, b| a.last_update.cmp(&b.last_update));
        Ok(aips)
    }
}
