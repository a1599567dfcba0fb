use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use domain_storage::{
    exception::FileRequestResult, model::entity::StorageLocation,
    repository::StorageLocationRepo, service::StorageLocationService,
};
use typed_builder::TypedBuilder;

#[derive(TypedBuilder)]
pub struct StorageLocationServiceImpl {
    location_repo: Arc<dyn StorageLocationRepo>,
}

#[async_trait]
impl StorageLocationService for StorageLocationServiceImpl {
    async fn list_active(&self) -> FileRequestResult<Vec<StorageLocation>> {
        Ok(self.location_repo.get_all_enabled().await?)
    }

    async fn get(&self, id: &str) -> FileRequestResult<Option<StorageLocation>> {
        Ok(self.location_repo.get_by_id(&id.to_owned()).await?)
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> FileRequestResult<()> {
        let mut location = self
            .location_repo
            .get_by_id(&id.to_owned())
            .await?
            .ok_or(anyhow!("No such storage location: {id}"))?;
        if location.enabled != enabled {
            location.enabled = enabled;
            self.location_repo.update(&location).await?;
            tracing::info!(
                "Storage location {id} {}.",
                if enabled { "enabled" } else { "disabled" }
            );
        }
        Ok(())
    }
}
