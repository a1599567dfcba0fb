use std::hash::Hash;

use anyhow::bail;
use archival_architecture::{
    model::AggregateRoot,
    repository::{DBRepository, MutableRepository, ReadOnlyRepository},
};
use dashmap::{mapref::entry::Entry, DashMap};
use domain_package::model::entity::{Aip, Sip};
use domain_storage::model::entity::{
    CacheFile, FileReference, FileRequest, RequestGroup, RequestResultInfo, StorageLocation,
};
use uuid::Uuid;

/// Every aggregate of the platform, kept in process memory.
///
/// Each map entry is locked on its own, multi entry consistency comes from the
/// keyed locks of the services.
#[derive(Default)]
pub struct MemoryRepository {
    pub(crate) references: DashMap<Uuid, FileReference>,
    pub(crate) requests: DashMap<Uuid, FileRequest>,
    pub(crate) groups: DashMap<String, RequestGroup>,
    pub(crate) results: DashMap<Uuid, RequestResultInfo>,
    pub(crate) locations: DashMap<String, StorageLocation>,
    pub(crate) cache_files: DashMap<String, CacheFile>,
    pub(crate) sips: DashMap<Uuid, Sip>,
    pub(crate) aips: DashMap<Uuid, Aip>,
}

/// An aggregate stored in one of the maps of [`MemoryRepository`].
pub trait Row: AggregateRoot + Clone + Send + Sync + 'static {
    const NAME: &'static str;

    fn key(&self) -> Self::Id;

    fn table(repo: &MemoryRepository) -> &DashMap<Self::Id, Self>;
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cloned rows matching `predicate`.
    pub(crate) fn select<T>(&self, predicate: impl Fn(&T) -> bool) -> Vec<T>
    where
        T: Row,
        T::Id: Eq + Hash,
    {
        T::table(self)
            .iter()
            .filter(|row| predicate(row.value()))
            .map(|row| row.value().clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl<T> ReadOnlyRepository<T> for MemoryRepository
where
    T: Row,
    T::Id: Eq + Hash + Clone,
{
    async fn get_by_id(&self, id: &T::Id) -> anyhow::Result<Option<T>> {
        Ok(T::table(self).get(id).map(|row| row.value().clone()))
    }

    async fn get_all(&self) -> anyhow::Result<Vec<T>> {
        Ok(self.select(|_: &T| true))
    }
}

#[async_trait::async_trait]
impl<T> MutableRepository<T> for MemoryRepository
where
    T: Row,
    T::Id: Eq + Hash + Clone + std::fmt::Display,
{
    async fn insert(&self, entity: &T) -> anyhow::Result<()> {
        match T::table(self).entry(entity.key()) {
            Entry::Occupied(entry) => bail!("{} {} already exists.", T::NAME, entry.key()),
            Entry::Vacant(entry) => {
                entry.insert(entity.clone());
                Ok(())
            }
        }
    }

    async fn update(&self, entity: &T) -> anyhow::Result<()> {
        let key = entity.key();
        match T::table(self).get_mut(&key) {
            Some(mut row) => {
                *row = entity.clone();
                Ok(())
            }
            None => bail!("No such {} {key}.", T::NAME),
        }
    }

    async fn delete_by_id(&self, id: &T::Id) -> anyhow::Result<()> {
        T::table(self).remove(id);
        Ok(())
    }
}

impl<T> DBRepository<T> for MemoryRepository
where
    T: Row,
    T::Id: Eq + Hash + Clone + std::fmt::Display,
{
}
