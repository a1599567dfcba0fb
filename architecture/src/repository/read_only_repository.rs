use crate::model::AggregateRoot;

/// Read-only repository.
#[async_trait::async_trait]
pub trait ReadOnlyRepository<T>
where
    T: AggregateRoot + Send + Sync,
{
    /// Get one aggregate by its key, `None` when it doesn't exist.
    async fn get_by_id(&self, id: &T::Id) -> anyhow::Result<Option<T>>;
    /// Get all aggregates.
    async fn get_all(&self) -> anyhow::Result<Vec<T>>;
}
