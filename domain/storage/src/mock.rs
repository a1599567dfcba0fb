use crate::{
    command::FileOperationRequest,
    model::{
        entity::{
            CacheFile, FileReference, FileRequest, RequestGroup, RequestResultInfo,
            StorageLocation,
        },
        vo::{FileRequestStatus, FileRequestType, FileToAllocate, GroupResult, StorageTarget},
    },
    exception::FileRequestResult,
    repository::{
        CacheFileRepo, FileReferenceRepo, FileRequestRepo, RequestGroupRepo, RequestResultInfoRepo,
        StorageLocationRepo,
    },
    service::{AllocationStrategy, DataStorageService, RequestDispatchService, RequestGroupService},
};
use archival_architecture::{
    message_queue::producer::MessageQueueProducerTemplate,
    repository::{DBRepository, MutableRepository, ReadOnlyRepository},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use infrastructure_command::{StorageJob, WorkerOutcome};
use mockall::mock;
use std::collections::BTreeSet;
use uuid::Uuid;

mock! {
    pub GroupResultProducer {}
    #[async_trait]
    impl MessageQueueProducerTemplate<GroupResult> for GroupResultProducer {
        async fn send_object(&self, content: &GroupResult, topic: &str) -> anyhow::Result<()>;
    }
}

mock! {
    pub StorageJobProducer {}
    #[async_trait]
    impl MessageQueueProducerTemplate<StorageJob> for StorageJobProducer {
        async fn send_object(&self, content: &StorageJob, topic: &str) -> anyhow::Result<()>;
    }
}

mock! {
    pub FileReferenceRepo {}
    #[async_trait]
    impl FileReferenceRepo for FileReferenceRepo {
        async fn get_by_checksum_and_storage(
            &self,
            checksum: &str,
            storage: &str,
        ) -> anyhow::Result<Option<FileReference>>;
        async fn get_all_by_checksum(&self, checksum: &str) -> anyhow::Result<Vec<FileReference>>;
    }
    #[async_trait]
    impl ReadOnlyRepository<FileReference> for FileReferenceRepo {
        async fn get_by_id(&self, id: &Uuid) -> anyhow::Result<Option<FileReference>>;
        async fn get_all(&self) -> anyhow::Result<Vec<FileReference>>;
    }
    #[async_trait]
    impl MutableRepository<FileReference> for FileReferenceRepo {
        async fn insert(&self, entity: &FileReference) -> anyhow::Result<()>;
        async fn update(&self, entity: &FileReference) -> anyhow::Result<()>;
        async fn delete_by_id(&self, id: &Uuid) -> anyhow::Result<()>;
    }
    impl DBRepository<FileReference> for FileReferenceRepo {}
}

mock! {
    pub FileRequestRepo {}
    #[async_trait]
    impl FileRequestRepo for FileRequestRepo {
        async fn get_active(
            &self,
            checksum: &str,
            storage: &str,
            r#type: FileRequestType,
        ) -> anyhow::Result<Option<FileRequest>>;
        async fn get_all_by_group(&self, group_id: &str) -> anyhow::Result<Vec<FileRequest>>;
        async fn get_all_by_status(
            &self,
            status: FileRequestStatus,
            limit: usize,
        ) -> anyhow::Result<Vec<FileRequest>>;
        async fn get_errors_by_owners(&self, owners: &[String]) -> anyhow::Result<Vec<FileRequest>>;
    }
    #[async_trait]
    impl ReadOnlyRepository<FileRequest> for FileRequestRepo {
        async fn get_by_id(&self, id: &Uuid) -> anyhow::Result<Option<FileRequest>>;
        async fn get_all(&self) -> anyhow::Result<Vec<FileRequest>>;
    }
    #[async_trait]
    impl MutableRepository<FileRequest> for FileRequestRepo {
        async fn insert(&self, entity: &FileRequest) -> anyhow::Result<()>;
        async fn update(&self, entity: &FileRequest) -> anyhow::Result<()>;
        async fn delete_by_id(&self, id: &Uuid) -> anyhow::Result<()>;
    }
    impl DBRepository<FileRequest> for FileRequestRepo {}
}

mock! {
    pub RequestGroupRepo {}
    #[async_trait]
    impl RequestGroupRepo for RequestGroupRepo {
        async fn get_unpublished(&self, limit: usize) -> anyhow::Result<Vec<RequestGroup>>;
    }
    #[async_trait]
    impl ReadOnlyRepository<RequestGroup> for RequestGroupRepo {
        async fn get_by_id(&self, id: &String) -> anyhow::Result<Option<RequestGroup>>;
        async fn get_all(&self) -> anyhow::Result<Vec<RequestGroup>>;
    }
    #[async_trait]
    impl MutableRepository<RequestGroup> for RequestGroupRepo {
        async fn insert(&self, entity: &RequestGroup) -> anyhow::Result<()>;
        async fn update(&self, entity: &RequestGroup) -> anyhow::Result<()>;
        async fn delete_by_id(&self, id: &String) -> anyhow::Result<()>;
    }
    impl DBRepository<RequestGroup> for RequestGroupRepo {}
}

mock! {
    pub RequestResultInfoRepo {}
    #[async_trait]
    impl RequestResultInfoRepo for RequestResultInfoRepo {
        async fn get_all_by_group(&self, group_id: &str) -> anyhow::Result<Vec<RequestResultInfo>>;
        async fn exists(&self, group_id: &str, request_id: Uuid) -> anyhow::Result<bool>;
        async fn delete_all_by_group(&self, group_id: &str) -> anyhow::Result<()>;
    }
    #[async_trait]
    impl ReadOnlyRepository<RequestResultInfo> for RequestResultInfoRepo {
        async fn get_by_id(&self, id: &Uuid) -> anyhow::Result<Option<RequestResultInfo>>;
        async fn get_all(&self) -> anyhow::Result<Vec<RequestResultInfo>>;
    }
    #[async_trait]
    impl MutableRepository<RequestResultInfo> for RequestResultInfoRepo {
        async fn insert(&self, entity: &RequestResultInfo) -> anyhow::Result<()>;
        async fn update(&self, entity: &RequestResultInfo) -> anyhow::Result<()>;
        async fn delete_by_id(&self, id: &Uuid) -> anyhow::Result<()>;
    }
    impl DBRepository<RequestResultInfo> for RequestResultInfoRepo {}
}

mock! {
    pub StorageLocationRepo {}
    #[async_trait]
    impl StorageLocationRepo for StorageLocationRepo {
        async fn get_all_enabled(&self) -> anyhow::Result<Vec<StorageLocation>>;
    }
    #[async_trait]
    impl ReadOnlyRepository<StorageLocation> for StorageLocationRepo {
        async fn get_by_id(&self, id: &String) -> anyhow::Result<Option<StorageLocation>>;
        async fn get_all(&self) -> anyhow::Result<Vec<StorageLocation>>;
    }
    #[async_trait]
    impl MutableRepository<StorageLocation> for StorageLocationRepo {
        async fn insert(&self, entity: &StorageLocation) -> anyhow::Result<()>;
        async fn update(&self, entity: &StorageLocation) -> anyhow::Result<()>;
        async fn delete_by_id(&self, id: &String) -> anyhow::Result<()>;
    }
    impl DBRepository<StorageLocation> for StorageLocationRepo {}
}

mock! {
    pub CacheFileRepo {}
    #[async_trait]
    impl CacheFileRepo for CacheFileRepo {
        async fn get_expired(&self, now: DateTime<Utc>, limit: usize) -> anyhow::Result<Vec<CacheFile>>;
    }
    #[async_trait]
    impl ReadOnlyRepository<CacheFile> for CacheFileRepo {
        async fn get_by_id(&self, id: &String) -> anyhow::Result<Option<CacheFile>>;
        async fn get_all(&self) -> anyhow::Result<Vec<CacheFile>>;
    }
    #[async_trait]
    impl MutableRepository<CacheFile> for CacheFileRepo {
        async fn insert(&self, entity: &CacheFile) -> anyhow::Result<()>;
        async fn update(&self, entity: &CacheFile) -> anyhow::Result<()>;
        async fn delete_by_id(&self, id: &String) -> anyhow::Result<()>;
    }
    impl DBRepository<CacheFile> for CacheFileRepo {}
}

mock! {
    pub RequestGroupService {}
    #[async_trait]
    impl RequestGroupService for RequestGroupService {
        async fn open(&self, group_id: &str, size: usize) -> FileRequestResult<bool>;
        async fn request_done(
            &self,
            request: &FileRequest,
            result_file: Option<FileReference>,
        ) -> FileRequestResult<()>;
        async fn seal(&self, group_id: &str) -> FileRequestResult<bool>;
        async fn check_group_completion(&self, group_id: &str) -> FileRequestResult<bool>;
        async fn check_all_groups(&self) -> FileRequestResult<usize>;
    }
}

mock! {
    pub AllocationStrategy {}
    impl AllocationStrategy for AllocationStrategy {
        fn id(&self) -> &str;
        fn select(
            &self,
            file: &FileToAllocate,
            locations: &[StorageLocation],
        ) -> FileRequestResult<BTreeSet<StorageTarget>>;
    }
}

mock! {
    pub DataStorageService {}
    #[async_trait]
    impl DataStorageService for DataStorageService {
        fn storage(&self) -> &str;
        async fn store(&self, path: &str, content: Vec<u8>) -> anyhow::Result<String>;
        async fn retrieve(&self, url: &str) -> anyhow::Result<Vec<u8>>;
        async fn delete(&self, url: &str) -> anyhow::Result<()>;
    }
}

mock! {
    pub RequestDispatchService {}
    #[async_trait]
    impl RequestDispatchService for RequestDispatchService {
        async fn submit(
            &self,
            group_id: &str,
            requests: Vec<FileOperationRequest>,
        ) -> FileRequestResult<()>;
        async fn dispatch_ready(&self) -> FileRequestResult<usize>;
        async fn on_worker_result(
            &self,
            request_id: Uuid,
            outcome: WorkerOutcome,
        ) -> FileRequestResult<()>;
        async fn sweep_delayed(&self) -> FileRequestResult<usize>;
        async fn surface_stale(&self) -> FileRequestResult<usize>;
        async fn retry_group(&self, group_id: &str, new_group_id: &str) -> FileRequestResult<usize>;
        async fn retry_owners(
            &self,
            owners: &[String],
            new_group_id: &str,
        ) -> FileRequestResult<usize>;
        async fn purge_cache(&self) -> FileRequestResult<usize>;
    }
}
