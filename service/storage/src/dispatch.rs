use std::{collections::BTreeSet, sync::Arc};

use archival_architecture::message_queue::producer::MessageQueueProducerTemplate;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use domain_storage::{
    command::{
        AvailabilityRequest, CopyRequest, DeletionRequest, FileOperationRequest,
        ReferenceRequest, StorageRequest, AUTO_STORAGE, CACHE_STORAGE,
    },
    exception::{FileRequestException, FileRequestResult},
    model::{
        entity::{
            CacheFile, FileLocation, FileReference, FileRequest, RequestDetails, StorageLocation,
        },
        vo::{FileRequestStatus, FileRequestType, StorageTarget},
    },
    repository::{CacheFileRepo, FileReferenceRepo, FileRequestRepo, StorageLocationRepo},
    service::{ensure_online, AllocationStrategy, RequestDispatchService, RequestGroupService},
};
use infrastructure_command::{JobKind, JobSource, StorageJob, WorkerOutcome};
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::lock::{file_key, KeyedLock};

/// A terminal request and the file reference it resulted in.
type Done = (FileRequest, Option<FileReference>);

enum Dispatched {
    Sent,
    Skipped,
    Finished(Done),
}

#[derive(TypedBuilder)]
pub struct RequestDispatchServiceImpl {
    reference_repo: Arc<dyn FileReferenceRepo>,
    request_repo: Arc<dyn FileRequestRepo>,
    location_repo: Arc<dyn StorageLocationRepo>,
    cache_repo: Arc<dyn CacheFileRepo>,
    group_service: Arc<dyn RequestGroupService>,
    allocation_strategy: Arc<dyn AllocationStrategy>,
    job_producer: Arc<dyn MessageQueueProducerTemplate<StorageJob>>,
    job_topic: String,
    locks: Arc<KeyedLock>,
    #[builder(default = Duration::hours(1))]
    running_staleness: Duration,
    #[builder(default = 100)]
    max_jobs_per_pass: usize,
    /// Cache retention of restored files when the request sets none.
    #[builder(default = Duration::hours(24))]
    cache_expiration: Duration,
}

/// Request carrying everything known from `operation`, still PENDING.
fn request_from(group_id: &str, operation: &FileOperationRequest) -> FileRequest {
    let details = match operation {
        FileOperationRequest::Storage(r) => RequestDetails::Storage {
            origin_url: r.origin_url.to_owned(),
            sub_directory: r.sub_directory.to_owned(),
        },
        FileOperationRequest::Deletion(r) => RequestDetails::Deletion {
            force_delete: r.force_delete,
        },
        FileOperationRequest::Copy(r) => RequestDetails::Copy {
            source_storage: String::new(),
            sub_directory: r.sub_directory.to_owned(),
        },
        FileOperationRequest::Reference(r) => RequestDetails::Reference {
            url: r.url.to_owned(),
        },
        FileOperationRequest::Availability(_) => RequestDetails::Availability {
            source_storage: String::new(),
            expires_at: Utc::now(),
        },
    };
    let mut request = FileRequest::new(
        operation.checksum(),
        operation.storage(),
        group_id,
        details,
    );
    if let Some(owner) = operation.owner().filter(|o| !o.is_empty()) {
        request.owners.insert(owner.to_owned());
    }
    let (session_owner, session) = operation.session();
    request.session_owner = Some(session_owner.to_owned()).filter(|s| !s.is_empty());
    request.session = Some(session.to_owned()).filter(|s| !s.is_empty());
    request.meta_info = match operation {
        FileOperationRequest::Storage(r) => Some(r.meta_info()),
        FileOperationRequest::Reference(r) => Some(r.meta_info()),
        _ => None,
    };
    request
}

fn sorted_by_priority(mut locations: Vec<StorageLocation>) -> Vec<StorageLocation> {
    locations.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
    locations
}

impl RequestDispatchServiceImpl {
    /// Unknown locations are treated as available, their worker reports the failure.
    async fn is_enabled(&self, storage: &str) -> anyhow::Result<bool> {
        Ok(self
            .location_repo
            .get_by_id(&storage.to_owned())
            .await?
            .map(|l| l.enabled)
            .unwrap_or(true))
    }

    async fn handle(
        &self,
        group_id: &str,
        operation: &FileOperationRequest,
    ) -> FileRequestResult<Vec<Done>> {
        match operation {
            FileOperationRequest::Storage(r) => self.handle_storage(group_id, r).await,
            FileOperationRequest::Deletion(r) => self.handle_deletion(group_id, r).await,
            FileOperationRequest::Copy(r) => self.handle_copy(group_id, r).await,
            FileOperationRequest::Reference(r) => self.handle_reference(group_id, r).await,
            FileOperationRequest::Availability(r) => self.handle_availability(group_id, r).await,
        }
    }

    /// The cache copy of `checksum`, unless its retention is over.
    async fn cached(&self, checksum: &str) -> anyhow::Result<Option<CacheFile>> {
        let now = Utc::now();
        Ok(self
            .cache_repo
            .get_by_id(&checksum.to_owned())
            .await?
            .filter(|file| !file.is_expired(now)))
    }

    /// Persist `operation` as a failed request of the group.
    async fn record_error(
        &self,
        group_id: &str,
        operation: &FileOperationRequest,
        cause: String,
    ) -> FileRequestResult<Done> {
        let mut request = request_from(group_id, operation);
        request.fail(cause)?;
        self.request_repo.insert(&request).await?;
        Ok((request, None))
    }

    async fn handle_storage(
        &self,
        group_id: &str,
        storage_request: &StorageRequest,
    ) -> FileRequestResult<Vec<Done>> {
        storage_request.validate()?;
        let locations = sorted_by_priority(self.location_repo.get_all().await?);
        let file = storage_request.to_allocate();
        let targets = if storage_request.storage == AUTO_STORAGE {
            let enabled: Vec<_> = locations.iter().filter(|l| l.enabled).cloned().collect();
            self.allocation_strategy.allocate(&file, &enabled)?
        } else {
            if !locations.iter().any(|l| l.id == storage_request.storage) {
                return Err(FileRequestException::UnknownStorage {
                    checksum: storage_request.checksum.to_owned(),
                    storage: storage_request.storage.to_owned(),
                });
            }
            let target = StorageTarget::with_sub_directory(
                &storage_request.storage,
                storage_request.sub_directory.to_owned(),
            );
            ensure_online(&file, BTreeSet::from([target]), &locations)?
        };

        let operation = FileOperationRequest::Storage(storage_request.to_owned());
        let mut done = vec![];
        for target in targets {
            let mut request = request_from(group_id, &operation);
            request.storage = target.storage.to_owned();
            request.details = RequestDetails::Storage {
                origin_url: storage_request.origin_url.to_owned(),
                sub_directory: target
                    .sub_directory
                    .or_else(|| storage_request.sub_directory.to_owned()),
            };
            let enabled = locations.iter().any(|l| l.id == target.storage && l.enabled);
            if let Some(finished) = self.store_on(group_id, request, enabled).await? {
                done.push(finished);
            }
        }
        Ok(done)
    }

    /// Create, merge or short-circuit the storage of one file on one location.
    async fn store_on(
        &self,
        group_id: &str,
        mut request: FileRequest,
        enabled: bool,
    ) -> FileRequestResult<Option<Done>> {
        let (checksum, storage) = (request.checksum.to_owned(), request.storage.to_owned());
        let _guard = self.locks.lock(file_key(&checksum, &storage)).await;

        let reference = self.reference_repo.get_by_checksum_and_storage(&checksum, &storage).await?;
        let deleting = match reference {
            Some(_) => self
                .request_repo
                .get_active(&checksum, &storage, FileRequestType::Deletion)
                .await?
                .is_some(),
            None => false,
        };
        if let (Some(mut file), false) = (reference, deleting) {
            // Same bytes are never written twice on one location.
            file.add_owners(&request.owners);
            self.reference_repo.update(&file).await?;
            request.transition(FileRequestStatus::Success)?;
            self.request_repo.insert(&request).await?;
            debug!("[STORAGE REQUEST {group_id}] File {checksum} already stored on {storage}, owners added.");
            return Ok(Some((request, Some(file))));
        }

        if let Some(mut active) = self
            .request_repo
            .get_active(&checksum, &storage, FileRequestType::Storage)
            .await?
        {
            active.merge(&request.owners, group_id);
            self.request_repo.update(&active).await?;
            debug!("[STORAGE REQUEST {group_id}] Merged into request {} of file {checksum} on {storage}.", active.id);
            return Ok(None);
        }

        let status = if deleting || !enabled {
            FileRequestStatus::Delayed
        } else {
            FileRequestStatus::ToDo
        };
        request.transition(status)?;
        self.request_repo.insert(&request).await?;
        debug!("[STORAGE REQUEST {group_id}] File {checksum} on {storage} is {status}.");
        Ok(None)
    }

    async fn handle_deletion(
        &self,
        group_id: &str,
        deletion: &DeletionRequest,
    ) -> FileRequestResult<Vec<Done>> {
        deletion.validate()?;
        let (checksum, storage) = (&deletion.checksum, &deletion.storage);
        let _guard = self.locks.lock(file_key(checksum, storage)).await;

        let mut request = request_from(group_id, &FileOperationRequest::Deletion(deletion.to_owned()));
        let mut file = match self.reference_repo.get_by_checksum_and_storage(checksum, storage).await? {
            Some(file) if file.owners.contains(&deletion.owner) => file,
            other => {
                debug!("[DELETION REQUEST {group_id}] Owner {} holds no file {checksum} on {storage}.", deletion.owner);
                request.transition(FileRequestStatus::Success)?;
                self.request_repo.insert(&request).await?;
                return Ok(vec![(request, other)]);
            }
        };

        if file.owners.len() > 1 {
            file.remove_owner(&deletion.owner);
            self.reference_repo.update(&file).await?;
            request.transition(FileRequestStatus::Success)?;
            self.request_repo.insert(&request).await?;
            debug!("[DELETION REQUEST {group_id}] Owner {} removed from file {checksum} on {storage}.", deletion.owner);
            return Ok(vec![(request, Some(file))]);
        }

        // Last owner: the file goes away physically, the owner stays until then.
        if let Some(mut active) = self
            .request_repo
            .get_active(checksum, storage, FileRequestType::Deletion)
            .await?
        {
            active.merge(&request.owners, group_id);
            if deletion.force_delete {
                active.force();
            }
            self.request_repo.update(&active).await?;
            return Ok(vec![]);
        }
        let status = if self.is_enabled(storage).await? {
            FileRequestStatus::ToDo
        } else {
            FileRequestStatus::Delayed
        };
        request.transition(status)?;
        self.request_repo.insert(&request).await?;
        Ok(vec![])
    }

    async fn handle_copy(&self, group_id: &str, copy: &CopyRequest) -> FileRequestResult<Vec<Done>> {
        copy.validate()?;
        let (checksum, storage) = (&copy.checksum, &copy.storage);
        let location = self
            .location_repo
            .get_by_id(storage)
            .await?
            .ok_or_else(|| FileRequestException::UnknownStorage {
                checksum: checksum.to_owned(),
                storage: storage.to_owned(),
            })?;
        let _guard = self.locks.lock(file_key(checksum, storage)).await;

        let mut request = request_from(group_id, &FileOperationRequest::Copy(copy.to_owned()));
        if let Some(existing) = self.reference_repo.get_by_checksum_and_storage(checksum, storage).await? {
            request.owners = existing.owners.clone();
            request.meta_info = Some(existing.meta_info.clone());
            request.transition(FileRequestStatus::Success)?;
            self.request_repo.insert(&request).await?;
            debug!("[COPY REQUEST {group_id}] File {checksum} already on {storage}.");
            return Ok(vec![(request, Some(existing))]);
        }

        let mut sources = self.reference_repo.get_all_by_checksum(checksum).await?;
        sources.sort_by(|a, b| a.storage().cmp(b.storage()));
        let source = sources
            .into_iter()
            .find(|f| f.storage() != storage.as_str())
            .ok_or_else(|| FileRequestException::SourceNotFound {
                checksum: checksum.to_owned(),
                storage: storage.to_owned(),
            })?;

        if let Some(mut active) = self
            .request_repo
            .get_active(checksum, storage, FileRequestType::Copy)
            .await?
        {
            active.merge(&source.owners, group_id);
            self.request_repo.update(&active).await?;
            return Ok(vec![]);
        }

        request.owners = source.owners.clone();
        request.meta_info = Some(source.meta_info.clone());
        request.details = RequestDetails::Copy {
            source_storage: source.location.storage.to_owned(),
            sub_directory: copy.sub_directory.to_owned(),
        };
        request.transition(if location.enabled {
            FileRequestStatus::ToDo
        } else {
            FileRequestStatus::Delayed
        })?;
        self.request_repo.insert(&request).await?;
        Ok(vec![])
    }

    async fn handle_reference(
        &self,
        group_id: &str,
        reference: &ReferenceRequest,
    ) -> FileRequestResult<Vec<Done>> {
        reference.validate()?;
        let (checksum, storage) = (&reference.checksum, &reference.storage);
        let _guard = self.locks.lock(file_key(checksum, storage)).await;

        let mut request =
            request_from(group_id, &FileOperationRequest::Reference(reference.to_owned()));
        let file = match self.reference_repo.get_by_checksum_and_storage(checksum, storage).await? {
            Some(mut file) => {
                file.add_owners(&request.owners);
                self.reference_repo.update(&file).await?;
                file
            }
            None => {
                let file = FileReference::new(
                    reference.meta_info(),
                    FileLocation {
                        storage: storage.to_owned(),
                        url: reference.url.to_owned(),
                    },
                    request.owners.iter().cloned(),
                );
                self.reference_repo.insert(&file).await?;
                file
            }
        };
        request.transition(FileRequestStatus::Success)?;
        self.request_repo.insert(&request).await?;
        debug!("[REFERENCE REQUEST {group_id}] File {checksum} referenced on {storage}.");
        Ok(vec![(request, Some(file))])
    }

    /// Serve the file from an online location or the cache, restore it to the cache otherwise.
    async fn handle_availability(
        &self,
        group_id: &str,
        availability: &AvailabilityRequest,
    ) -> FileRequestResult<Vec<Done>> {
        availability.validate()?;
        let checksum = &availability.checksum;
        let files = self.reference_repo.get_all_by_checksum(checksum).await?;
        let Some(first) = files.first() else {
            return Err(FileRequestException::FileNotFound {
                checksum: checksum.to_owned(),
            });
        };
        let locations = sorted_by_priority(self.location_repo.get_all().await?);
        // Enabled locations first, each part by priority.
        let mut holders: Vec<_> = locations
            .iter()
            .filter_map(|l| files.iter().find(|f| f.storage() == l.id).map(|f| (l, f)))
            .collect();
        holders.sort_by_key(|(location, _)| !location.enabled);

        let _guard = self.locks.lock(file_key(checksum, CACHE_STORAGE)).await;
        let mut request =
            request_from(group_id, &FileOperationRequest::Availability(availability.to_owned()));
        for file in files.iter() {
            request.owners.extend(file.owners.iter().cloned());
        }
        request.meta_info = Some(first.meta_info.clone());
        let expires_at = Utc::now()
            + availability
                .expiration_hours
                .map(Duration::hours)
                .unwrap_or(self.cache_expiration);

        if let Some((location, file)) = holders.iter().find(|(l, _)| l.enabled && l.online) {
            request.transition(FileRequestStatus::Success)?;
            self.request_repo.insert(&request).await?;
            debug!("[AVAILABILITY REQUEST {group_id}] File {checksum} is online on {}.", location.id);
            return Ok(vec![(request, Some((*file).clone()))]);
        }
        if let Some(mut cached) = self.cached(checksum).await? {
            cached.extend(expires_at);
            self.cache_repo.update(&cached).await?;
            request.transition(FileRequestStatus::Success)?;
            self.request_repo.insert(&request).await?;
            debug!("[AVAILABILITY REQUEST {group_id}] File {checksum} already in cache.");
            return Ok(vec![(request, Some(cached.to_reference()))]);
        }
        if let Some(mut active) = self
            .request_repo
            .get_active(checksum, CACHE_STORAGE, FileRequestType::Availability)
            .await?
        {
            active.merge(&request.owners, group_id);
            active.extend_retention(expires_at);
            self.request_repo.update(&active).await?;
            return Ok(vec![]);
        }

        let (location, source) =
            holders
                .first()
                .ok_or_else(|| FileRequestException::SourceNotFound {
                    checksum: checksum.to_owned(),
                    storage: CACHE_STORAGE.to_owned(),
                })?;
        request.details = RequestDetails::Availability {
            source_storage: source.storage().to_owned(),
            expires_at,
        };
        let status = if location.enabled {
            FileRequestStatus::ToDo
        } else {
            FileRequestStatus::Delayed
        };
        request.transition(status)?;
        self.request_repo.insert(&request).await?;
        debug!("[AVAILABILITY REQUEST {group_id}] File {checksum} restored from {} is {status}.", location.id);
        Ok(vec![])
    }

    async fn dispatch_one(&self, request_id: Uuid, checksum: &str, storage: &str) -> FileRequestResult<Dispatched> {
        let _guard = self.locks.lock(file_key(checksum, storage)).await;
        let dispatched = self.dispatch_locked(request_id, checksum, storage).await?;
        if let Dispatched::Finished((request, file)) = &dispatched {
            self.group_service.request_done(request, file.clone()).await?;
        }
        Ok(dispatched)
    }

    /// Must be called under the file lock.
    async fn dispatch_locked(&self, request_id: Uuid, checksum: &str, storage: &str) -> FileRequestResult<Dispatched> {
        let mut request = match self.request_repo.get_by_id(&request_id).await? {
            Some(request) if request.status == FileRequestStatus::ToDo => request,
            _ => return Ok(Dispatched::Skipped),
        };
        if !self.is_enabled(request.blocking_storage()).await? {
            request.transition(FileRequestStatus::Delayed)?;
            self.request_repo.update(&request).await?;
            return Ok(Dispatched::Skipped);
        }

        let existing = self.reference_repo.get_by_checksum_and_storage(checksum, storage).await?;
        let details = request.details.clone();
        let kind = match (&details, existing) {
            (RequestDetails::Storage { .. } | RequestDetails::Copy { .. }, Some(mut file)) => {
                file.add_owners(&request.owners);
                self.reference_repo.update(&file).await?;
                request.transition(FileRequestStatus::Success)?;
                self.request_repo.update(&request).await?;
                return Ok(Dispatched::Finished((request, Some(file))));
            }
            (RequestDetails::Storage { origin_url, .. }, None) => JobKind::Store {
                source: JobSource::Origin {
                    url: origin_url.to_owned(),
                },
            },
            (RequestDetails::Copy { source_storage, .. }, None) => {
                match self
                    .reference_repo
                    .get_by_checksum_and_storage(checksum, source_storage)
                    .await?
                {
                    Some(source) => JobKind::Store {
                        source: JobSource::Copy {
                            source_storage: source_storage.to_owned(),
                            source_checksum: checksum.to_owned(),
                            url: source.location.url,
                        },
                    },
                    None => {
                        let cause = FileRequestException::SourceNotFound {
                            checksum: checksum.to_owned(),
                            storage: storage.to_owned(),
                        };
                        request.fail(cause.to_string())?;
                        self.request_repo.update(&request).await?;
                        return Ok(Dispatched::Finished((request, None)));
                    }
                }
            }
            (RequestDetails::Availability { source_storage, .. }, _) => {
                if let Some(cached) = self.cached(checksum).await? {
                    request.transition(FileRequestStatus::Success)?;
                    self.request_repo.update(&request).await?;
                    return Ok(Dispatched::Finished((request, Some(cached.to_reference()))));
                }
                match self
                    .reference_repo
                    .get_by_checksum_and_storage(checksum, source_storage)
                    .await?
                {
                    Some(source) => JobKind::Store {
                        source: JobSource::Copy {
                            source_storage: source_storage.to_owned(),
                            source_checksum: checksum.to_owned(),
                            url: source.location.url,
                        },
                    },
                    None => {
                        let cause = FileRequestException::SourceNotFound {
                            checksum: checksum.to_owned(),
                            storage: storage.to_owned(),
                        };
                        request.fail(cause.to_string())?;
                        self.request_repo.update(&request).await?;
                        return Ok(Dispatched::Finished((request, None)));
                    }
                }
            }
            (RequestDetails::Deletion { .. }, Some(file)) => JobKind::Delete {
                url: file.location.url,
            },
            (RequestDetails::Deletion { .. }, None) => {
                request.transition(FileRequestStatus::Success)?;
                self.request_repo.update(&request).await?;
                return Ok(Dispatched::Finished((request, None)));
            }
            (RequestDetails::Reference { .. }, _) => {
                request.fail("Reference requests have nothing to dispatch.")?;
                self.request_repo.update(&request).await?;
                return Ok(Dispatched::Finished((request, None)));
            }
        };

        let meta = request.meta_info.clone().unwrap_or_default();
        let job = StorageJob {
            request_id,
            storage: storage.to_owned(),
            checksum: checksum.to_owned(),
            algorithm: meta.algorithm,
            file_name: meta.file_name,
            size: meta.file_size,
            mime_type: meta.mime_type,
            destination_path: request.destination_path(),
            kind,
        };
        request.transition(FileRequestStatus::Running)?;
        self.request_repo.update(&request).await?;
        if let Err(e) = self.job_producer.send_object(&job, &self.job_topic).await {
            request.fail(format!("Cannot dispatch to storage worker: {e}"))?;
            self.request_repo.update(&request).await?;
            return Ok(Dispatched::Finished((request, None)));
        }
        debug!("[{} REQUEST] Request {request_id} dispatched to {storage}.", request.r#type());
        Ok(Dispatched::Sent)
    }

    async fn apply_outcome(&self, mut request: FileRequest, outcome: WorkerOutcome) -> FileRequestResult<Done> {
        let r#type = request.r#type();
        match (r#type, outcome) {
            (FileRequestType::Availability, WorkerOutcome::Stored { url, size }) => {
                let expires_at = match &request.details {
                    RequestDetails::Availability { expires_at, .. } => *expires_at,
                    _ => Utc::now() + self.cache_expiration,
                };
                let file = match self.cache_repo.get_by_id(&request.checksum).await? {
                    Some(mut file) => {
                        file.url = url;
                        file.owners.extend(request.owners.iter().cloned());
                        file.extend(expires_at);
                        self.cache_repo.update(&file).await?;
                        file
                    }
                    None => {
                        let mut meta = request.meta_info.clone().unwrap_or_default();
                        meta.checksum = request.checksum.to_owned();
                        meta.file_size = size;
                        let file = CacheFile::new(meta, url, request.owners.clone(), expires_at);
                        self.cache_repo.insert(&file).await?;
                        file
                    }
                };
                request.transition(FileRequestStatus::Success)?;
                self.request_repo.update(&request).await?;
                info!(
                    "[AVAILABILITY REQUEST] File {} restored to cache at {} until {}.",
                    request.checksum, file.url, file.expires_at
                );
                Ok((request, Some(file.to_reference())))
            }
            (FileRequestType::Storage | FileRequestType::Copy, WorkerOutcome::Stored { url, size }) => {
                let file = match self
                    .reference_repo
                    .get_by_checksum_and_storage(&request.checksum, &request.storage)
                    .await?
                {
                    Some(mut file) => {
                        file.add_owners(&request.owners);
                        self.reference_repo.update(&file).await?;
                        file
                    }
                    None => {
                        let mut meta = request.meta_info.clone().unwrap_or_default();
                        meta.checksum = request.checksum.to_owned();
                        meta.file_size = size;
                        let file = FileReference::new(
                            meta,
                            FileLocation {
                                storage: request.storage.to_owned(),
                                url,
                            },
                            request.owners.iter().cloned(),
                        );
                        self.reference_repo.insert(&file).await?;
                        file
                    }
                };
                request.transition(FileRequestStatus::Success)?;
                self.request_repo.update(&request).await?;
                info!("[{} REQUEST] File {} stored on {} at {}.", r#type, request.checksum, request.storage, file.location.url);
                Ok((request, Some(file)))
            }
            (FileRequestType::Deletion, WorkerOutcome::Deleted) => self.release_deletion(request).await,
            (FileRequestType::Deletion, WorkerOutcome::Failed { cause }) if request.force_delete() => {
                warn!(
                    "[DELETION REQUEST] Forced deletion of file {} on {} failed, the file may still exist: {cause}",
                    request.checksum, request.storage
                );
                self.release_deletion(request).await
            }
            (_, WorkerOutcome::Failed { cause }) => {
                error!("[{} REQUEST] File {} on {}: {cause}", r#type, request.checksum, request.storage);
                request.fail(cause)?;
                self.request_repo.update(&request).await?;
                Ok((request, None))
            }
            (_, outcome) => {
                request.fail(format!("Unexpected worker outcome {outcome:?} for a {} request.", r#type))?;
                self.request_repo.update(&request).await?;
                Ok((request, None))
            }
        }
    }

    /// Remove the owners of a finished deletion, and the file with the last one.
    async fn release_deletion(&self, mut request: FileRequest) -> FileRequestResult<Done> {
        let (checksum, storage) = (request.checksum.to_owned(), request.storage.to_owned());
        let file = match self.reference_repo.get_by_checksum_and_storage(&checksum, &storage).await? {
            Some(mut file) => {
                for owner in &request.owners {
                    file.remove_owner(owner);
                }
                if file.is_orphan() {
                    self.reference_repo.delete_by_id(&file.id).await?;
                    info!("[DELETION REQUEST] File {checksum} deleted from {storage}.");
                } else {
                    self.reference_repo.update(&file).await?;
                }
                Some(file)
            }
            None => None,
        };
        request.transition(FileRequestStatus::Success)?;
        self.request_repo.update(&request).await?;

        // Storage requests waiting for this deletion can go now.
        if let Some(mut waiting) = self
            .request_repo
            .get_active(&checksum, &storage, FileRequestType::Storage)
            .await?
        {
            if waiting.status == FileRequestStatus::Delayed && self.is_enabled(&storage).await? {
                waiting.transition(FileRequestStatus::ToDo)?;
                self.request_repo.update(&waiting).await?;
            }
        }
        Ok((request, file))
    }

    /// Complete the groups of a request finished outside of its batch submission.
    async fn check_groups(&self, request: &FileRequest) -> FileRequestResult<()> {
        for group_id in &request.group_ids {
            self.group_service.check_group_completion(group_id).await?;
        }
        Ok(())
    }

    async fn retry(&self, failed: Vec<FileRequest>, new_group_id: &str) -> FileRequestResult<usize> {
        if failed.is_empty() || !self.group_service.open(new_group_id, failed.len()).await? {
            return Ok(0);
        }
        let mut retried = 0;
        for old in failed {
            let _guard = self.locks.lock(file_key(&old.checksum, &old.storage)).await;
            let old = match self.request_repo.get_by_id(&old.id).await? {
                Some(old) if old.status == FileRequestStatus::Error => old,
                _ => continue,
            };
            let mut clone = old.retry_clone(new_group_id);
            match self
                .request_repo
                .get_active(&old.checksum, &old.storage, old.r#type())
                .await?
            {
                Some(mut active) => {
                    active.merge(&clone.owners, new_group_id);
                    self.request_repo.update(&active).await?;
                }
                None => {
                    clone.transition(if self.is_enabled(clone.blocking_storage()).await? {
                        FileRequestStatus::ToDo
                    } else {
                        FileRequestStatus::Delayed
                    })?;
                    self.request_repo.insert(&clone).await?;
                }
            }
            self.request_repo.delete_by_id(&old.id).await?;
            info!(
                "[{} REQUEST {new_group_id}] Request {} of file {} on {} retried as {} (retry {}).",
                old.r#type(), old.id, old.checksum, old.storage, clone.id, clone.retry_count
            );
            retried += 1;
        }
        self.group_service.seal(new_group_id).await?;
        Ok(retried)
    }
}

#[async_trait]
impl RequestDispatchService for RequestDispatchServiceImpl {
    async fn submit(
        &self,
        group_id: &str,
        requests: Vec<FileOperationRequest>,
    ) -> FileRequestResult<()> {
        if !self.group_service.open(group_id, requests.len()).await? {
            return Ok(());
        }
        for operation in requests {
            let done = match self.handle(group_id, &operation).await {
                Ok(done) => done,
                Err(e) => {
                    error!(
                        "[{} REQUEST {group_id}] File {} on {}: {e}",
                        operation.r#type(),
                        operation.checksum(),
                        operation.storage()
                    );
                    vec![self.record_error(group_id, &operation, e.to_string()).await?]
                }
            };
            // The batch keeps the group open until these outcomes are recorded.
            for (request, file) in done {
                self.group_service.request_done(&request, file).await?;
            }
        }
        self.group_service.seal(group_id).await?;
        Ok(())
    }

    async fn dispatch_ready(&self) -> FileRequestResult<usize> {
        let ready = self
            .request_repo
            .get_all_by_status(FileRequestStatus::ToDo, self.max_jobs_per_pass)
            .await?;
        let mut sent = 0;
        for request in ready {
            match self.dispatch_one(request.id, &request.checksum, &request.storage).await {
                Ok(Dispatched::Sent) => sent += 1,
                Ok(Dispatched::Skipped) => {}
                Ok(Dispatched::Finished((request, _))) => self.check_groups(&request).await?,
                Err(e) => error!("Cannot dispatch request {}: {e}", request.id),
            }
        }
        Ok(sent)
    }

    async fn on_worker_result(
        &self,
        request_id: Uuid,
        outcome: WorkerOutcome,
    ) -> FileRequestResult<()> {
        let Some(request) = self.request_repo.get_by_id(&request_id).await? else {
            warn!("Worker result for unknown request {request_id} ignored.");
            return Ok(());
        };
        let request = {
            let _guard = self.locks.lock(file_key(&request.checksum, &request.storage)).await;
            let request = match self.request_repo.get_by_id(&request_id).await? {
                Some(request) if request.status == FileRequestStatus::Running => request,
                Some(request) => {
                    warn!(
                        "[{} REQUEST] Worker result for request {request_id} in state {} ignored.",
                        request.r#type(),
                        request.status
                    );
                    return Ok(());
                }
                None => return Ok(()),
            };
            let (request, file) = self.apply_outcome(request, outcome).await?;
            self.group_service.request_done(&request, file).await?;
            request
        };
        self.check_groups(&request).await
    }

    async fn sweep_delayed(&self) -> FileRequestResult<usize> {
        let delayed = self
            .request_repo
            .get_all_by_status(FileRequestStatus::Delayed, self.max_jobs_per_pass)
            .await?;
        let mut released = 0;
        for request in delayed {
            let _guard = self.locks.lock(file_key(&request.checksum, &request.storage)).await;
            let mut request = match self.request_repo.get_by_id(&request.id).await? {
                Some(request) if request.status == FileRequestStatus::Delayed => request,
                _ => continue,
            };
            if !self.is_enabled(request.blocking_storage()).await? {
                continue;
            }
            if request.r#type() == FileRequestType::Storage
                && self
                    .request_repo
                    .get_active(&request.checksum, &request.storage, FileRequestType::Deletion)
                    .await?
                    .is_some()
            {
                continue;
            }
            request.transition(FileRequestStatus::ToDo)?;
            self.request_repo.update(&request).await?;
            released += 1;
        }
        if released > 0 {
            info!("{released} delayed requests released.");
        }
        Ok(released)
    }

    async fn surface_stale(&self) -> FileRequestResult<usize> {
        let running = self
            .request_repo
            .get_all_by_status(FileRequestStatus::Running, self.max_jobs_per_pass)
            .await?;
        let now = Utc::now();
        let mut lost = vec![];
        for request in running.into_iter().filter(|r| r.is_stale(now, self.running_staleness)) {
            let _guard = self.locks.lock(file_key(&request.checksum, &request.storage)).await;
            let mut request = match self.request_repo.get_by_id(&request.id).await? {
                Some(request) if request.is_stale(now, self.running_staleness) => request,
                _ => continue,
            };
            request.fail(format!(
                "Request suspected lost: no worker result after {} seconds.",
                self.running_staleness.num_seconds()
            ))?;
            self.request_repo.update(&request).await?;
            self.group_service.request_done(&request, None).await?;
            warn!("[{} REQUEST] Request {} of file {} on {} suspected lost.", request.r#type(), request.id, request.checksum, request.storage);
            lost.push(request);
        }
        let count = lost.len();
        for request in lost {
            self.check_groups(&request).await?;
        }
        Ok(count)
    }

    async fn retry_group(&self, group_id: &str, new_group_id: &str) -> FileRequestResult<usize> {
        let failed = self
            .request_repo
            .get_all_by_group(group_id)
            .await?
            .into_iter()
            .filter(|r| r.status == FileRequestStatus::Error)
            .collect();
        self.retry(failed, new_group_id).await
    }

    async fn retry_owners(
        &self,
        owners: &[String],
        new_group_id: &str,
    ) -> FileRequestResult<usize> {
        let failed = self.request_repo.get_errors_by_owners(owners).await?;
        self.retry(failed, new_group_id).await
    }

    async fn purge_cache(&self) -> FileRequestResult<usize> {
        let now = Utc::now();
        let mut purged = 0;
        for file in self.cache_repo.get_expired(now, self.max_jobs_per_pass).await? {
            let _guard = self.locks.lock(file_key(&file.checksum, CACHE_STORAGE)).await;
            let file = match self.cache_repo.get_by_id(&file.checksum).await? {
                Some(file) if file.is_expired(now) => file,
                _ => continue,
            };
            // A restoration in progress writes the same path.
            if self
                .request_repo
                .get_active(&file.checksum, CACHE_STORAGE, FileRequestType::Availability)
                .await?
                .is_some()
            {
                continue;
            }
            self.cache_repo.delete_by_id(&file.checksum).await?;
            let job = StorageJob {
                request_id: Uuid::new_v4(),
                storage: CACHE_STORAGE.to_owned(),
                checksum: file.checksum.to_owned(),
                algorithm: file.meta_info.algorithm,
                file_name: file.meta_info.file_name,
                size: file.meta_info.file_size,
                mime_type: file.meta_info.mime_type,
                destination_path: file.checksum,
                kind: JobKind::Evict { url: file.url },
            };
            self.job_producer.send_object(&job, &self.job_topic).await?;
            purged += 1;
        }
        if purged > 0 {
            info!("{purged} expired cache files evicted.");
        }
        Ok(purged)
    }
}
