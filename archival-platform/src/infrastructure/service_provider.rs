use std::{collections::HashMap, sync::Arc};

use anyhow::bail;
use archival_architecture::{hosting::BackgroundService, repository::MutableRepository};
use domain_package::service::PackageLifecycleService;
use domain_storage::{
    command::CACHE_STORAGE,
    service::{
        DataStorageService, RequestDispatchService, RequestGroupService, StorageLocationService,
    },
};
use service_package::PackageLifecycleServiceImpl;
use service_storage::{
    allocation::AllocationStrategyRegistry, KeyedLock, RequestDispatchServiceImpl,
    RequestGroupServiceImpl, StorageLocationServiceImpl,
};

use super::{
    background_service::{DispatchRunner, MaintenanceRunner},
    config::PlatformConfig,
    database::MemoryRepository,
    internal_message_consumer::{event_consumers, job_consumers},
    message_queue::{InternalMessageQueueConsumer, InternalMessageQueueProducer},
    service::{OpendalDataStorage, OriginFetcher, StorageWorkerRunner},
};

/// Every service of the platform, wired once at startup.
pub struct ServiceProvider {
    pub config: PlatformConfig,
    pub repository: Arc<MemoryRepository>,
    /// Requests, worker reports, group results and package changes.
    pub event_queue: Arc<InternalMessageQueueProducer>,
    /// Storage jobs, consumed by the storage worker.
    pub job_queue: Arc<InternalMessageQueueProducer>,
    pub location_service: Arc<dyn StorageLocationService>,
    pub group_service: Arc<dyn RequestGroupService>,
    pub dispatch_service: Arc<dyn RequestDispatchService>,
    pub package_service: Arc<dyn PackageLifecycleService>,
    pub storage_worker: Arc<StorageWorkerRunner>,
}

impl ServiceProvider {
    pub async fn build(config: config::Config) -> anyhow::Result<Self> {
        Self::with_config(config.try_deserialize::<PlatformConfig>()?).await
    }

    pub async fn with_config(config: PlatformConfig) -> anyhow::Result<Self> {
        let topics = config.internal_topics.clone();
        let repository = Arc::new(MemoryRepository::new());
        let event_queue = Arc::new(InternalMessageQueueProducer::new());
        let job_queue = Arc::new(InternalMessageQueueProducer::new());
        let locks = Arc::new(KeyedLock::new());

        let mut storages: HashMap<String, Arc<dyn DataStorageService>> = HashMap::new();
        for storage in config.storages.iter() {
            if storages.contains_key(&storage.id) {
                bail!("Storage location {} is configured twice.", storage.id);
            }
            repository.insert(&storage.location()).await?;
            storages.insert(
                storage.id.to_owned(),
                Arc::new(OpendalDataStorage::from_config(storage)?),
            );
        }

        if storages.contains_key(CACHE_STORAGE) {
            bail!("Storage location id {CACHE_STORAGE} is reserved for the cache.");
        }
        // Only the storage worker knows the cache backend.
        storages.insert(
            CACHE_STORAGE.to_owned(),
            Arc::new(OpendalDataStorage::from_config(&config.cache.backend_config())?),
        );

        let allocation_strategy = AllocationStrategyRegistry::default()
            .build(&config.allocation.strategy, &config.allocation.options)?;

        let location_service = Arc::new(
            StorageLocationServiceImpl::builder()
                .location_repo(repository.clone())
                .build(),
        );
        let group_service: Arc<dyn RequestGroupService> = Arc::new(
            RequestGroupServiceImpl::builder()
                .group_repo(repository.clone())
                .request_repo(repository.clone())
                .result_repo(repository.clone())
                .result_producer(event_queue.clone())
                .result_topic(topics.group_results.to_owned())
                .locks(locks.clone())
                .expiration(config.requests.group_expiration())
                .max_groups_per_pass(config.requests.max_jobs_per_pass)
                .build(),
        );
        let dispatch_service: Arc<dyn RequestDispatchService> = Arc::new(
            RequestDispatchServiceImpl::builder()
                .reference_repo(repository.clone())
                .request_repo(repository.clone())
                .location_repo(repository.clone())
                .cache_repo(repository.clone())
                .group_service(group_service.clone())
                .allocation_strategy(allocation_strategy)
                .job_producer(job_queue.clone())
                .job_topic(topics.storage_jobs.to_owned())
                .locks(locks)
                .running_staleness(config.requests.running_staleness())
                .max_jobs_per_pass(config.requests.max_jobs_per_pass)
                .cache_expiration(config.cache.expiration())
                .build(),
        );
        let package_service = Arc::new(
            PackageLifecycleServiceImpl::builder()
                .sip_repo(repository.clone())
                .aip_repo(repository.clone())
                .dispatch_service(dispatch_service.clone())
                .change_producer(event_queue.clone())
                .change_topic(topics.package_changes.to_owned())
                .build(),
        );
        let storage_worker = Arc::new(
            StorageWorkerRunner::builder()
                .storages(storages)
                .fetcher(Arc::new(OriginFetcher::new(config.http_timeout_secs)?))
                .report_producer(event_queue.clone())
                .report_topic(topics.worker_reports.to_owned())
                .build(),
        );

        Ok(Self {
            config,
            repository,
            event_queue,
            job_queue,
            location_service,
            group_service,
            dispatch_service,
            package_service,
            storage_worker,
        })
    }

    pub fn background_services(self: &Arc<Self>) -> Vec<Arc<dyn BackgroundService>> {
        let topics = &self.config.internal_topics;
        let requests = &self.config.requests;
        let mut services: Vec<Arc<dyn BackgroundService>> = vec![];
        services.push(Arc::new(InternalMessageQueueConsumer::new(
            "EVENTS",
            self.event_queue.get_receiver(),
            self.clone(),
            event_consumers(topics),
        )));
        services.push(Arc::new(
            InternalMessageQueueConsumer::new(
                "STORAGE WORKER",
                self.job_queue.get_receiver(),
                self.clone(),
                job_consumers(topics),
            )
            .concurrent(),
        ));
        services.push(Arc::new(DispatchRunner::new(
            requests.dispatch_interval_secs,
            self.dispatch_service.clone(),
        )));
        services.push(Arc::new(MaintenanceRunner::new(
            requests.sweep_interval_secs,
            self.dispatch_service.clone(),
            self.group_service.clone(),
        )));
        services
    }
}
