use archival_architecture::repository::DBRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::entity::CacheFile;

#[async_trait]
pub trait CacheFileRepo: DBRepository<CacheFile> + Send + Sync {
    /// Copies whose retention ended before `now`, at most `limit`.
    async fn get_expired(&self, now: DateTime<Utc>, limit: usize) -> anyhow::Result<Vec<CacheFile>>;
}
