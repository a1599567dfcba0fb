use std::sync::Arc;

use chrono::{Duration, Utc};
use domain_storage::{
    command::{AvailabilityRequest, FileOperationRequest, StorageRequest},
    mock::{
        MockAllocationStrategy, MockCacheFileRepo, MockFileReferenceRepo, MockFileRequestRepo,
        MockRequestGroupService, MockStorageJobProducer, MockStorageLocationRepo,
    },
    model::{
        entity::{
            FileLocation, FileReference, FileReferenceMetaInfo, FileRequest, RequestDetails,
            StorageLocation,
        },
        vo::{FileRequestStatus, FileRequestType},
    },
    service::RequestDispatchService,
};
use infrastructure_command::WorkerOutcome;
use service_storage::{KeyedLock, RequestDispatchServiceImpl};
use uuid::Uuid;

struct Mocks {
    reference_repo: MockFileReferenceRepo,
    request_repo: MockFileRequestRepo,
    location_repo: MockStorageLocationRepo,
    cache_repo: MockCacheFileRepo,
    group_service: MockRequestGroupService,
}

impl Mocks {
    fn new() -> Self {
        Self {
            reference_repo: MockFileReferenceRepo::new(),
            request_repo: MockFileRequestRepo::new(),
            location_repo: MockStorageLocationRepo::new(),
            cache_repo: MockCacheFileRepo::new(),
            group_service: MockRequestGroupService::new(),
        }
    }

    fn build(self) -> RequestDispatchServiceImpl {
        RequestDispatchServiceImpl::builder()
            .reference_repo(Arc::new(self.reference_repo))
            .request_repo(Arc::new(self.request_repo))
            .location_repo(Arc::new(self.location_repo))
            .cache_repo(Arc::new(self.cache_repo))
            .group_service(Arc::new(self.group_service))
            .allocation_strategy(Arc::new(MockAllocationStrategy::new()))
            .job_producer(Arc::new(MockStorageJobProducer::new()))
            .job_topic("storage-jobs".to_owned())
            .locks(Arc::new(KeyedLock::new()))
            .build()
    }
}

fn running_storage_request() -> FileRequest {
    let mut request = FileRequest::new(
        "abc123",
        "S1",
        "G1",
        RequestDetails::Storage {
            origin_url: "file:///data/abc123".to_owned(),
            sub_directory: None,
        },
    );
    request.owners.insert("aip-1".to_owned());
    request.transition(FileRequestStatus::ToDo).unwrap();
    request.transition(FileRequestStatus::Running).unwrap();
    request
}

#[tokio::test]
async fn test_invalid_entry_becomes_failed_request() {
    let mut mocks = Mocks::new();
    mocks
        .group_service
        .expect_open()
        .withf(|group_id, size| group_id == "G1" && *size == 1)
        .times(1)
        .returning(|_, _| Ok(true));
    mocks
        .request_repo
        .expect_insert()
        .withf(|request| {
            request.status == FileRequestStatus::Error
                && request
                    .error_cause
                    .as_deref()
                    .is_some_and(|cause| cause.contains("owner is mandatory"))
        })
        .times(1)
        .returning(|_| Ok(()));
    mocks
        .group_service
        .expect_request_done()
        .withf(|request, file| request.status == FileRequestStatus::Error && file.is_none())
        .times(1)
        .returning(|_, _| Ok(()));
    mocks
        .group_service
        .expect_seal()
        .times(1)
        .returning(|_| Ok(true));

    let request = StorageRequest {
        file_name: "abc.fits".to_owned(),
        checksum: "abc123".to_owned(),
        algorithm: "MD5".to_owned(),
        origin_url: "file:///data/abc123".to_owned(),
        storage: "S1".to_owned(),
        session_owner: "provider".to_owned(),
        ..Default::default()
    };
    mocks
        .build()
        .submit("G1", vec![FileOperationRequest::Storage(request)])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_denied_group_creates_nothing() {
    let mut mocks = Mocks::new();
    mocks
        .group_service
        .expect_open()
        .times(1)
        .returning(|_, _| Ok(false));
    mocks.build().submit("G1", vec![]).await.unwrap();
}

#[tokio::test]
async fn test_result_for_finished_request_is_ignored() {
    let mut mocks = Mocks::new();
    let mut request = running_storage_request();
    request.transition(FileRequestStatus::Success).unwrap();
    let id = request.id;
    mocks
        .request_repo
        .expect_get_by_id()
        .returning(move |_| Ok(Some(request.clone())));

    mocks
        .build()
        .on_worker_result(
            id,
            WorkerOutcome::Stored {
                url: "s1://abc123".to_owned(),
                size: 12,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_result_for_unknown_request_is_ignored() {
    let mut mocks = Mocks::new();
    mocks.request_repo.expect_get_by_id().returning(|_| Ok(None));
    mocks
        .build()
        .on_worker_result(Uuid::new_v4(), WorkerOutcome::Deleted)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stored_result_creates_reference() {
    let mut mocks = Mocks::new();
    let request = running_storage_request();
    let id = request.id;
    mocks
        .request_repo
        .expect_get_by_id()
        .returning(move |_| Ok(Some(request.clone())));
    mocks
        .reference_repo
        .expect_get_by_checksum_and_storage()
        .returning(|_, _| Ok(None));
    mocks
        .reference_repo
        .expect_insert()
        .withf(|file| {
            file.location.url == "s1://abc123"
                && file.meta_info.file_size == 12
                && file.owners.contains("aip-1")
        })
        .times(1)
        .returning(|_| Ok(()));
    mocks
        .request_repo
        .expect_update()
        .withf(|request| request.status == FileRequestStatus::Success)
        .times(1)
        .returning(|_| Ok(()));
    mocks
        .group_service
        .expect_request_done()
        .withf(|_, file| file.is_some())
        .times(1)
        .returning(|_, _| Ok(()));
    mocks
        .group_service
        .expect_check_group_completion()
        .withf(|group_id| group_id == "G1")
        .times(1)
        .returning(|_| Ok(false));

    mocks
        .build()
        .on_worker_result(
            id,
            WorkerOutcome::Stored {
                url: "s1://abc123".to_owned(),
                size: 12,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_storage_result_fails_request() {
    let mut mocks = Mocks::new();
    let request = running_storage_request();
    let id = request.id;
    mocks
        .request_repo
        .expect_get_by_id()
        .returning(move |_| Ok(Some(request.clone())));
    mocks
        .request_repo
        .expect_update()
        .withf(|request| {
            request.status == FileRequestStatus::Error
                && request.error_cause.as_deref() == Some("origin unreachable")
        })
        .times(1)
        .returning(|_| Ok(()));
    mocks
        .group_service
        .expect_request_done()
        .times(1)
        .returning(|_, _| Ok(()));
    mocks
        .group_service
        .expect_check_group_completion()
        .times(1)
        .returning(|_| Ok(true));

    mocks
        .build()
        .on_worker_result(
            id,
            WorkerOutcome::Failed {
                cause: "origin unreachable".to_owned(),
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_availability_joins_restoration_in_progress() {
    let mut mocks = Mocks::new();
    mocks.group_service.expect_open().returning(|_, _| Ok(true));
    mocks.group_service.expect_seal().times(1).returning(|_| Ok(false));
    mocks.reference_repo.expect_get_all_by_checksum().returning(|checksum| {
        let meta = FileReferenceMetaInfo {
            checksum: checksum.to_owned(),
            ..Default::default()
        };
        let location = FileLocation {
            storage: "tape".to_owned(),
            url: "tape://abc123".to_owned(),
        };
        Ok(vec![FileReference::new(meta, location, ["aip-2".to_owned()])])
    });
    mocks
        .location_repo
        .expect_get_all()
        .returning(|| Ok(vec![StorageLocation::new("tape", 0, false)]));
    mocks.cache_repo.expect_get_by_id().returning(|_| Ok(None));

    let expires_at = Utc::now() + Duration::hours(1);
    let mut active = FileRequest::new(
        "abc123",
        "cache",
        "G1",
        RequestDetails::Availability {
            source_storage: "tape".to_owned(),
            expires_at,
        },
    );
    active.transition(FileRequestStatus::ToDo).unwrap();
    mocks
        .request_repo
        .expect_get_active()
        .withf(|checksum, storage, r#type| {
            checksum == "abc123" && storage == "cache" && *r#type == FileRequestType::Availability
        })
        .returning(move |_, _, _| Ok(Some(active.clone())));
    mocks
        .request_repo
        .expect_update()
        .withf(move |request| {
            request.group_ids.contains("G2")
                && request.owners.contains("aip-2")
                && matches!(
                    request.details,
                    RequestDetails::Availability { expires_at: until, .. } if until > expires_at
                )
        })
        .times(1)
        .returning(|_| Ok(()));

    let request = AvailabilityRequest {
        checksum: "abc123".to_owned(),
        expiration_hours: Some(48),
        session_owner: "consumer".to_owned(),
        session: "session-1".to_owned(),
    };
    mocks
        .build()
        .submit("G2", vec![FileOperationRequest::Availability(request)])
        .await
        .unwrap();
}
