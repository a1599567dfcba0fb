/// Marker for entities persisted through a repository.
pub trait AggregateRoot {
    /// Key the repository looks the aggregate up by.
    type Id: Send + Sync;
}
