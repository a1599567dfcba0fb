use crate::model::AggregateRoot;

/// Repository able to modify data.
#[async_trait::async_trait]
pub trait MutableRepository<T>
where
    T: AggregateRoot + Send + Sync,
{
    /// Insert a new aggregate, failing if the key is already taken.
    async fn insert(&self, entity: &T) -> anyhow::Result<()>;
    /// Replace an existing aggregate, failing if it doesn't exist.
    async fn update(&self, entity: &T) -> anyhow::Result<()>;
    /// Delete by key. Deleting a missing aggregate is not an error.
    async fn delete_by_id(&self, id: &T::Id) -> anyhow::Result<()>;
}
