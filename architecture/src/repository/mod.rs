//! Abstraction over the persistence layer.
mod mutable_repository;
mod read_only_repository;

#[rustfmt::skip]
pub use {
    mutable_repository::MutableRepository,
    read_only_repository::ReadOnlyRepository,
};

use crate::model::AggregateRoot;

/// A repository backed by a database, able to both read and write.
#[async_trait::async_trait]
pub trait DBRepository<T>: ReadOnlyRepository<T> + MutableRepository<T>
where
    T: AggregateRoot + Send + Sync,
{
}
