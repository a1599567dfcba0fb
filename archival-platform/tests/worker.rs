mod common;

use archival_architecture::repository::{MutableRepository, ReadOnlyRepository};
use archival_platform::infrastructure::config::{StorageBackendConfig, StorageLocationConfig};
use chrono::{Duration, Utc};
use common::{available, delete, memory_storage, storage_request, Platform};
use domain_storage::{
    command::{CopyRequest, FileOperationRequest},
    model::{
        entity::{CacheFile, FileReferenceMetaInfo},
        vo::GroupStatus,
    },
    repository::FileReferenceRepo,
};
use infrastructure_command::{JobKind, JobSource};
use url::Url;

struct Origin {
    _dir: tempfile::TempDir,
    url: String,
    checksum: String,
}

fn origin(content: &[u8]) -> Origin {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.fits");
    std::fs::write(&path, content).unwrap();
    Origin {
        url: Url::from_file_path(&path).unwrap().to_string(),
        checksum: blake3::hash(content).to_hex().to_string(),
        _dir: dir,
    }
}

fn store_origin(origin: &Origin, storage: &str, checksum: &str) -> FileOperationRequest {
    let mut request = storage_request(checksum, storage, "aip-1");
    request.algorithm = "BLAKE3".to_owned();
    request.origin_url = origin.url.to_owned();
    FileOperationRequest::Storage(request)
}

#[tokio::test]
async fn test_origin_is_fetched_verified_and_written() {
    let content = b"archived bytes";
    let origin = origin(content);
    let mut platform = Platform::new(vec![memory_storage("S1", 0, true)]).await;
    platform
        .submit("G1", vec![store_origin(&origin, "S1", &origin.checksum)])
        .await;
    platform.settle().await;

    assert_eq!(platform.completion("G1").status, GroupStatus::Success);
    let reference = platform
        .sp
        .repository
        .get_by_checksum_and_storage(&origin.checksum, "S1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reference.location.url, format!("s1://{}", origin.checksum));
    assert_eq!(reference.meta_info.file_size, content.len() as u64);
    let stored = platform
        .sp
        .storage_worker
        .backend("S1")
        .unwrap()
        .retrieve(&reference.location.url)
        .await
        .unwrap();
    assert_eq!(stored, content);
}

#[tokio::test]
async fn test_checksum_mismatch_fails_the_request() {
    let origin = origin(b"archived bytes");
    let declared = blake3::hash(b"other bytes").to_hex().to_string();
    let mut platform = Platform::new(vec![memory_storage("S1", 0, true)]).await;
    platform
        .submit("G1", vec![store_origin(&origin, "S1", &declared)])
        .await;
    platform.settle().await;

    let completion = platform.completion("G1");
    assert_eq!(completion.status, GroupStatus::Error);
    assert!(completion.results[0]
        .error_cause
        .as_deref()
        .unwrap()
        .contains("checksum mismatch"));
    assert!(platform
        .sp
        .repository
        .get_all_by_checksum(&declared)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_missing_origin_fails_the_request() {
    let mut platform = Platform::new(vec![memory_storage("S1", 0, true)]).await;
    platform
        .submit("G1", vec![common::store("abc123", "S1", "aip-1")])
        .await;
    platform.settle().await;

    let completion = platform.completion("G1");
    assert_eq!(completion.status, GroupStatus::Error);
    assert!(completion.results[0]
        .error_cause
        .as_deref()
        .unwrap()
        .contains("Cannot read"));
}

#[tokio::test]
async fn test_copy_reads_the_stored_file() {
    let content = b"archived bytes";
    let origin = origin(content);
    let mut platform = Platform::new(vec![
        memory_storage("S1", 0, true),
        memory_storage("S2", 1, true),
    ])
    .await;
    platform
        .submit("G1", vec![store_origin(&origin, "S1", &origin.checksum)])
        .await;
    platform.settle().await;

    let copy = FileOperationRequest::Copy(CopyRequest {
        checksum: origin.checksum.to_owned(),
        storage: "S2".to_owned(),
        sub_directory: Some("/copies/".to_owned()),
        session_owner: "provider".to_owned(),
        session: "session-1".to_owned(),
    });
    platform.submit("G2", vec![copy]).await;
    platform.dispatch().await;
    let jobs = platform.take_jobs();
    assert_eq!(jobs[0].destination_path, format!("copies/{}", origin.checksum));
    assert!(matches!(
        &jobs[0].kind,
        JobKind::Store { source: JobSource::Copy { source_storage, .. } } if source_storage == "S1"
    ));
    for job in jobs {
        platform.sp.storage_worker.run_job(job).await.unwrap();
    }
    platform.drain_events().await;

    assert_eq!(platform.completion("G2").status, GroupStatus::Success);
    let copied = platform
        .sp
        .repository
        .get_by_checksum_and_storage(&origin.checksum, "S2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(copied.location.url, format!("s2://copies/{}", origin.checksum));
    assert!(copied.owners.contains("aip-1"));
    let stored = platform
        .sp
        .storage_worker
        .backend("S2")
        .unwrap()
        .retrieve(&copied.location.url)
        .await
        .unwrap();
    assert_eq!(stored, content);
}

#[tokio::test]
async fn test_deletion_removes_the_file_from_disk() {
    let root = tempfile::tempdir().unwrap();
    let origin = origin(b"archived bytes");
    let mut platform = Platform::new(vec![StorageLocationConfig {
        id: "disk".to_owned(),
        priority: 0,
        online: true,
        enabled: true,
        backend: StorageBackendConfig::Fs {
            root: root.path().to_string_lossy().to_string(),
        },
    }])
    .await;
    platform
        .submit("G1", vec![store_origin(&origin, "disk", &origin.checksum)])
        .await;
    platform.settle().await;
    let written = root.path().join(&origin.checksum);
    assert!(written.exists());

    platform
        .submit("G2", vec![delete(&origin.checksum, "disk", "aip-1", false)])
        .await;
    platform.settle().await;

    assert_eq!(platform.completion("G2").status, GroupStatus::Success);
    assert!(!written.exists());
    assert!(platform
        .sp
        .repository
        .get_by_checksum_and_storage(&origin.checksum, "disk")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_offline_file_is_restored_to_the_cache() {
    let content = b"archived bytes";
    let origin = origin(content);
    let mut platform = Platform::new(vec![memory_storage("tape", 0, false)]).await;
    platform
        .submit("G1", vec![store_origin(&origin, "tape", &origin.checksum)])
        .await;
    platform.settle().await;
    assert_eq!(platform.completion("G1").status, GroupStatus::Success);

    platform
        .submit("G2", vec![available(&origin.checksum, Some(2))])
        .await;
    platform.dispatch().await;
    let jobs = platform.take_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].storage, "cache");
    assert!(matches!(
        &jobs[0].kind,
        JobKind::Store { source: JobSource::Copy { source_storage, .. } } if source_storage == "tape"
    ));
    for job in jobs {
        platform.sp.storage_worker.run_job(job).await.unwrap();
    }
    platform.drain_events().await;

    let completion = platform.completion("G2");
    assert_eq!(completion.status, GroupStatus::Success);
    let file = completion.results[0].result_file.as_ref().unwrap();
    assert_eq!(file.location.storage, "cache");
    assert_eq!(file.location.url, format!("cache://{}", origin.checksum));
    assert!(file.owners.contains("aip-1"));
    let restored = platform
        .sp
        .storage_worker
        .backend("cache")
        .unwrap()
        .retrieve(&file.location.url)
        .await
        .unwrap();
    assert_eq!(restored, content);
    let repository = &*platform.sp.repository;
    let cached = ReadOnlyRepository::<CacheFile>::get_by_id(repository, &origin.checksum)
        .await
        .unwrap()
        .unwrap();
    assert!(cached.expires_at <= Utc::now() + Duration::hours(2));

    // Served from the cache while it lasts.
    platform
        .submit("G3", vec![available(&origin.checksum, None)])
        .await;
    assert_eq!(platform.dispatch().await, 0);
    let completion = platform.completion("G3");
    assert_eq!(completion.status, GroupStatus::Success);
    assert_eq!(
        completion.results[0].result_file.as_ref().unwrap().location.url,
        format!("cache://{}", origin.checksum)
    );
}

#[tokio::test]
async fn test_expired_cache_copy_is_evicted() {
    let mut platform = Platform::new(vec![memory_storage("tape", 0, false)]).await;
    let cache = platform.sp.storage_worker.backend("cache").unwrap().clone();
    let url = cache.store("abc123", b"archived bytes".to_vec()).await.unwrap();
    let meta = FileReferenceMetaInfo {
        checksum: "abc123".to_owned(),
        ..Default::default()
    };
    let expired = CacheFile::new(meta, &url, Default::default(), Utc::now() - Duration::minutes(1));
    let repository = platform.sp.repository.clone();
    MutableRepository::<CacheFile>::insert(&*repository, &expired)
        .await
        .unwrap();

    assert_eq!(platform.sp.dispatch_service.purge_cache().await.unwrap(), 1);
    assert!(
        ReadOnlyRepository::<CacheFile>::get_by_id(&*repository, &"abc123".to_owned())
            .await
            .unwrap()
            .is_none()
    );

    assert_eq!(platform.run_jobs().await, 1);
    assert!(cache.retrieve(&url).await.is_err());
    // Evictions are not reported.
    assert!(platform
        .published::<serde_json::Value>(&platform.sp.config.internal_topics.worker_reports)
        .is_empty());
    assert_eq!(platform.sp.dispatch_service.purge_cache().await.unwrap(), 0);
}
