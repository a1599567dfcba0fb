use std::sync::{Arc, Mutex};

use domain_package::{
    exception::PackageException,
    mock::{MockAipChangeProducer, MockAipRepo, MockSipRepo},
    model::{
        entity::{Aip, Sip},
        vo::{AipChangeMsg, AipState, SipState},
    },
    service::PackageLifecycleService,
};
use domain_storage::{
    command::FileOperationRequest,
    mock::MockRequestDispatchService,
    model::{
        entity::{FileLocation, FileReference, FileReferenceMetaInfo, FileRequest, RequestDetails, RequestResultInfo},
        vo::{FileRequestStatus, GroupResult},
    },
};
use indoc::indoc;
use service_package::PackageLifecycleServiceImpl;

type Shared<T> = Arc<Mutex<T>>;

struct Harness {
    service: PackageLifecycleServiceImpl,
    aip: Shared<Option<Aip>>,
    sip: Shared<Option<Sip>>,
    changes: Shared<Vec<AipChangeMsg>>,
    submitted: Shared<Vec<(String, Vec<FileOperationRequest>)>>,
}

fn sip() -> Sip {
    serde_json::from_str(indoc! {r#"
        {
            "id": "0b5cbb4e-7a37-4c5e-8d0c-3f0e1b2a9c44",
            "providerId": "provider-1",
            "sessionOwner": "provider",
            "session": "session-1",
            "files": [
                {
                    "fileName": "a.fits",
                    "checksum": "aaa111",
                    "algorithm": "MD5",
                    "mimeType": "application/fits",
                    "size": 10,
                    "originUrl": "file:///data/a.fits"
                },
                {
                    "fileName": "b.fits",
                    "checksum": "bbb222",
                    "algorithm": "MD5",
                    "mimeType": "application/fits",
                    "size": 20,
                    "originUrl": "file:///data/b.fits",
                    "storage": "S1"
                }
            ]
        }
    "#})
    .unwrap()
}

fn harness() -> Harness {
    let aip: Shared<Option<Aip>> = Arc::new(Mutex::new(None));
    let sip_state: Shared<Option<Sip>> = Arc::new(Mutex::new(None));
    let changes = Arc::new(Mutex::new(vec![]));
    let submitted = Arc::new(Mutex::new(vec![]));

    let mut sip_repo = MockSipRepo::new();
    let inserted = sip_state.clone();
    sip_repo.expect_insert().returning(move |sip| {
        *inserted.lock().unwrap() = Some(sip.clone());
        Ok(())
    });
    let read = sip_state.clone();
    sip_repo
        .expect_get_by_id()
        .returning(move |_| Ok(read.lock().unwrap().clone()));
    let updated = sip_state.clone();
    sip_repo.expect_update().returning(move |sip| {
        *updated.lock().unwrap() = Some(sip.clone());
        Ok(())
    });

    let mut aip_repo = MockAipRepo::new();
    let inserted = aip.clone();
    aip_repo.expect_insert().returning(move |aip| {
        *inserted.lock().unwrap() = Some(aip.clone());
        Ok(())
    });
    let read = aip.clone();
    aip_repo
        .expect_get_by_id()
        .returning(move |_| Ok(read.lock().unwrap().clone()));
    let by_group = aip.clone();
    aip_repo.expect_get_by_group_id().returning(move |group_id| {
        Ok(by_group.lock().unwrap().clone().filter(|aip| {
            aip.storage_group_id.as_deref() == Some(group_id)
                || aip.deletion_group_id.as_deref() == Some(group_id)
        }))
    });
    let updated = aip.clone();
    aip_repo.expect_update().returning(move |aip| {
        *updated.lock().unwrap() = Some(aip.clone());
        Ok(())
    });

    let mut dispatch = MockRequestDispatchService::new();
    let recorded = submitted.clone();
    dispatch
        .expect_submit()
        .returning(move |group_id, requests| {
            recorded
                .lock()
                .unwrap()
                .push((group_id.to_owned(), requests));
            Ok(())
        });

    let mut producer = MockAipChangeProducer::new();
    let sent = changes.clone();
    producer.expect_send_object().returning(move |msg, _| {
        sent.lock().unwrap().push(msg.clone());
        Ok(())
    });

    let service = PackageLifecycleServiceImpl::builder()
        .sip_repo(Arc::new(sip_repo))
        .aip_repo(Arc::new(aip_repo))
        .dispatch_service(Arc::new(dispatch))
        .change_producer(Arc::new(producer))
        .change_topic("aip-changes".to_owned())
        .build();
    Harness {
        service,
        aip,
        sip: sip_state,
        changes,
        submitted,
    }
}

fn result_info(
    group_id: &str,
    checksum: &str,
    storage: &str,
    details: RequestDetails,
    error: Option<&str>,
) -> RequestResultInfo {
    let mut request = FileRequest::new(checksum, storage, group_id, details);
    let file = match error {
        Some(cause) => {
            request.fail(cause).unwrap();
            None
        }
        None => {
            request.transition(FileRequestStatus::Success).unwrap();
            Some(FileReference::new(
                FileReferenceMetaInfo::default(),
                FileLocation {
                    storage: storage.to_owned(),
                    url: format!("{}://{checksum}", storage.to_lowercase()),
                },
                ["owner".to_owned()],
            ))
        }
    };
    RequestResultInfo::new(group_id, &request, file.as_ref())
}

fn stored(group_id: &str, checksum: &str, error: Option<&str>) -> RequestResultInfo {
    result_info(
        group_id,
        checksum,
        "S1",
        RequestDetails::Storage {
            origin_url: format!("file:///data/{checksum}"),
            sub_directory: None,
        },
        error,
    )
}

fn deleted(group_id: &str, checksum: &str, error: Option<&str>) -> RequestResultInfo {
    result_info(
        group_id,
        checksum,
        "S1",
        RequestDetails::Deletion { force_delete: false },
        error,
    )
}

fn last_group(h: &Harness) -> String {
    h.submitted.lock().unwrap().last().unwrap().0.to_owned()
}

fn state(h: &Harness) -> AipState {
    h.aip.lock().unwrap().as_ref().unwrap().state
}

#[tokio::test]
async fn test_ingest_then_store() {
    let h = harness();
    let aip_id = h.service.ingest(sip()).await.unwrap();
    assert_eq!(h.sip.lock().unwrap().as_ref().unwrap().state, SipState::AipCreated);

    h.service.request_storage(aip_id).await.unwrap();
    let group_id = last_group(&h);
    {
        let submitted = h.submitted.lock().unwrap();
        let requests = &submitted[0].1;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].storage(), "auto");
        assert_eq!(requests[1].storage(), "S1");
        assert_eq!(requests[0].owner(), Some(aip_id.to_string().as_str()));
    }

    h.service
        .on_group_result(GroupResult::granted(&group_id))
        .await
        .unwrap();
    assert_eq!(state(&h), AipState::StorageRequestGranted);

    let results = vec![stored(&group_id, "aaa111", None), stored(&group_id, "bbb222", None)];
    h.service
        .on_group_result(GroupResult::completed(&group_id, results))
        .await
        .unwrap();
    assert_eq!(state(&h), AipState::Stored);
    assert_eq!(h.aip.lock().unwrap().as_ref().unwrap().locations.len(), 2);
    assert_eq!(h.sip.lock().unwrap().as_ref().unwrap().state, SipState::Stored);

    let states: Vec<_> = h.changes.lock().unwrap().iter().map(|m| m.state).collect();
    assert_eq!(
        states,
        vec![
            AipState::Created,
            AipState::StorageRequestGranted,
            AipState::Stored
        ]
    );
}

#[tokio::test]
async fn test_storage_error_then_retry() {
    let h = harness();
    let aip_id = h.service.ingest(sip()).await.unwrap();
    h.service.request_storage(aip_id).await.unwrap();
    let first = last_group(&h);

    // The completion may arrive before the grant is processed.
    let results = vec![
        stored(&first, "aaa111", None),
        stored(&first, "bbb222", Some("origin unreachable")),
    ];
    h.service
        .on_group_result(GroupResult::completed(&first, results))
        .await
        .unwrap();
    assert_eq!(state(&h), AipState::StorageError);
    let message = h.aip.lock().unwrap().as_ref().unwrap().error_message.clone();
    assert!(message.unwrap().contains("origin unreachable"));
    assert_eq!(h.sip.lock().unwrap().as_ref().unwrap().state, SipState::StoreError);

    assert!(matches!(
        h.service.request_storage(aip_id).await,
        Err(PackageException::InvalidTransition { .. })
    ));

    h.service.retry_storage(aip_id).await.unwrap();
    let second = last_group(&h);
    assert_ne!(first, second);

    // Results of the old group are not correlated anymore.
    h.service
        .on_group_result(GroupResult::completed(&first, vec![]))
        .await
        .unwrap();
    assert_eq!(state(&h), AipState::StorageError);

    h.service
        .on_group_result(GroupResult::completed(
            &second,
            vec![stored(&second, "aaa111", None), stored(&second, "bbb222", None)],
        ))
        .await
        .unwrap();
    assert_eq!(state(&h), AipState::Stored);
    assert_eq!(h.aip.lock().unwrap().as_ref().unwrap().locations.len(), 2);
}

#[tokio::test]
async fn test_partial_deletion_failure_is_denied() {
    let h = harness();
    let aip_id = h.service.ingest(sip()).await.unwrap();
    h.service.request_storage(aip_id).await.unwrap();
    let storage_group = last_group(&h);
    h.service
        .on_group_result(GroupResult::completed(
            &storage_group,
            vec![
                stored(&storage_group, "aaa111", None),
                stored(&storage_group, "bbb222", None),
            ],
        ))
        .await
        .unwrap();

    h.service.request_deletion(aip_id, false).await.unwrap();
    assert_eq!(state(&h), AipState::ToBeDeleted);
    let deletion_group = last_group(&h);
    assert_eq!(h.submitted.lock().unwrap()[1].1.len(), 2);

    h.service
        .on_group_result(GroupResult::granted(&deletion_group))
        .await
        .unwrap();
    h.service
        .on_group_result(GroupResult::completed(
            &deletion_group,
            vec![
                deleted(&deletion_group, "aaa111", None),
                deleted(&deletion_group, "bbb222", Some("backend unreachable")),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(state(&h), AipState::DeletionRequestDenied);
    let locations = h.aip.lock().unwrap().as_ref().unwrap().locations.clone();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].checksum, "bbb222");
    assert_eq!(h.sip.lock().unwrap().as_ref().unwrap().state, SipState::Stored);

    h.service.request_deletion(aip_id, true).await.unwrap();
    let retry_group = last_group(&h);
    h.service
        .on_group_result(GroupResult::completed(
            &retry_group,
            vec![deleted(&retry_group, "bbb222", None)],
        ))
        .await
        .unwrap();
    assert_eq!(state(&h), AipState::Deleted);
    assert_eq!(h.sip.lock().unwrap().as_ref().unwrap().state, SipState::Deleted);
}

#[tokio::test]
async fn test_empty_package_is_refused() {
    let h = harness();
    let mut sip = sip();
    sip.files.clear();
    assert!(matches!(
        h.service.ingest(sip).await,
        Err(PackageException::EmptyPackage { .. })
    ));
    assert!(h.aip.lock().unwrap().is_none());
}
