use chrono::{DateTime, Utc};
use dashmap::DashMap;
use domain_storage::{model::entity::CacheFile, repository::CacheFileRepo};

use crate::infrastructure::database::{MemoryRepository, Row};

impl Row for CacheFile {
    const NAME: &'static str = "cache file";

    fn key(&self) -> String {
        self.checksum.to_owned()
    }

    fn table(repo: &MemoryRepository) -> &DashMap<String, Self> {
        &repo.cache_files
    }
}

#[async_trait::async_trait]
impl CacheFileRepo for MemoryRepository {
    async fn get_expired(&self, now: DateTime<Utc>, limit: usize) -> anyhow::Result<Vec<CacheFile>> {
        let mut files = self.select(|f: &CacheFile| f.is_expired(now));
        files.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
        files.truncate(limit);
        Ok(files)
    }
}
