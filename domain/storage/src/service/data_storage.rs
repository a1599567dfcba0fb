use async_trait::async_trait;

/// Physical access to one storage location.
#[async_trait]
pub trait DataStorageService: Send + Sync {
    /// Identifier of the storage location.
    fn storage(&self) -> &str;

    /// Write `content` at `path`, return the url it is reachable at.
    async fn store(&self, path: &str, content: Vec<u8>) -> anyhow::Result<String>;

    async fn retrieve(&self, url: &str) -> anyhow::Result<Vec<u8>>;

    async fn delete(&self, url: &str) -> anyhow::Result<()>;
}
