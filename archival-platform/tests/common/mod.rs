#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use archival_architecture::message_queue::producer::MessageQueueProducerTemplate;
use archival_platform::infrastructure::{
    config::{PlatformConfig, StorageBackendConfig, StorageLocationConfig},
    internal_message_consumer::{event_consumers, job_consumers},
    message_queue::{ConsumerFn, InternalMessage},
    ServiceProvider,
};
use domain_storage::{
    command::{
        AvailabilityRequest, DeletionRequest, FileOperationRequest, GroupRequestCommand,
        StorageRequest,
    },
    model::vo::GroupResult,
};
use infrastructure_command::{StorageJob, WorkerReport};
use serde::de::DeserializeOwned;

/// Drives the platform by hand: every queued message is handled by its real
/// consumer when the test asks for it, nothing runs in the background.
pub struct Platform {
    pub sp: Arc<ServiceProvider>,
    events: flume::Receiver<InternalMessage>,
    jobs: flume::Receiver<InternalMessage>,
    event_consumers: HashMap<String, ConsumerFn<ServiceProvider>>,
    job_consumers: HashMap<String, ConsumerFn<ServiceProvider>>,
    history: Vec<InternalMessage>,
}

pub fn memory_storage(id: &str, priority: u32, online: bool) -> StorageLocationConfig {
    StorageLocationConfig {
        id: id.to_owned(),
        priority,
        online,
        enabled: true,
        backend: StorageBackendConfig::Memory,
    }
}

pub fn storage_request(checksum: &str, storage: &str, owner: &str) -> StorageRequest {
    StorageRequest {
        file_name: format!("{checksum}.fits"),
        checksum: checksum.to_owned(),
        algorithm: "MD5".to_owned(),
        mime_type: "application/fits".to_owned(),
        file_size: 12,
        owner: owner.to_owned(),
        origin_url: format!("file:///data/{checksum}.fits"),
        storage: storage.to_owned(),
        session_owner: "provider".to_owned(),
        session: "session-1".to_owned(),
        r#type: "RAWDATA".to_owned(),
        ..Default::default()
    }
}

pub fn store(checksum: &str, storage: &str, owner: &str) -> FileOperationRequest {
    FileOperationRequest::Storage(storage_request(checksum, storage, owner))
}

pub fn delete(checksum: &str, storage: &str, owner: &str, force_delete: bool) -> FileOperationRequest {
    FileOperationRequest::Deletion(DeletionRequest {
        checksum: checksum.to_owned(),
        storage: storage.to_owned(),
        owner: owner.to_owned(),
        force_delete,
        session_owner: "provider".to_owned(),
        session: "session-1".to_owned(),
    })
}

pub fn available(checksum: &str, expiration_hours: Option<i64>) -> FileOperationRequest {
    FileOperationRequest::Availability(AvailabilityRequest {
        checksum: checksum.to_owned(),
        expiration_hours,
        session_owner: "consumer".to_owned(),
        session: "session-1".to_owned(),
    })
}

impl Platform {
    pub async fn new(storages: Vec<StorageLocationConfig>) -> Self {
        Self::with_config(PlatformConfig {
            storages,
            ..Default::default()
        })
        .await
    }

    pub async fn with_config(config: PlatformConfig) -> Self {
        let topics = config.internal_topics.clone();
        let sp = Arc::new(ServiceProvider::with_config(config).await.unwrap());
        Self {
            events: sp.event_queue.get_receiver(),
            jobs: sp.job_queue.get_receiver(),
            event_consumers: event_consumers(&topics),
            job_consumers: job_consumers(&topics),
            history: vec![],
            sp,
        }
    }

    /// Handle queued events until none is left.
    pub async fn drain_events(&mut self) {
        while let Ok(message) = self.events.try_recv() {
            self.history.push(message.clone());
            if let Some(consumer) = self.event_consumers.get(&message.target).copied() {
                consumer(message.body, self.sp.clone()).await.unwrap();
            }
        }
    }

    /// Send a batch the way a producer does.
    pub async fn submit(&mut self, group_id: &str, requests: Vec<FileOperationRequest>) {
        let command = GroupRequestCommand {
            group_id: group_id.to_owned(),
            requests,
        };
        self.sp
            .event_queue
            .send_object(&command, &self.sp.config.internal_topics.file_requests)
            .await
            .unwrap();
        self.drain_events().await;
    }

    pub async fn dispatch(&mut self) -> usize {
        let sent = self.sp.dispatch_service.dispatch_ready().await.unwrap();
        self.drain_events().await;
        sent
    }

    /// Jobs sent to the storage workers, removed from the queue.
    pub fn take_jobs(&mut self) -> Vec<StorageJob> {
        let mut jobs = vec![];
        while let Ok(message) = self.jobs.try_recv() {
            jobs.push(serde_json::from_str(&message.body).unwrap());
        }
        jobs
    }

    /// Answer for a storage worker.
    pub async fn report(&mut self, report: WorkerReport) {
        self.sp
            .event_queue
            .send_object(&report, &self.sp.config.internal_topics.worker_reports)
            .await
            .unwrap();
        self.drain_events().await;
    }

    /// Let the storage worker run the queued jobs against the backends.
    pub async fn run_jobs(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(message) = self.jobs.try_recv() {
            if let Some(consumer) = self.job_consumers.get(&message.target).copied() {
                consumer(message.body, self.sp.clone()).await.unwrap();
                ran += 1;
            }
        }
        self.drain_events().await;
        ran
    }

    /// Dispatch and execute until no work is left.
    pub async fn settle(&mut self) {
        loop {
            self.dispatch().await;
            if self.run_jobs().await == 0 {
                break;
            }
        }
    }

    pub fn published<T: DeserializeOwned>(&self, topic: &str) -> Vec<T> {
        self.history
            .iter()
            .filter(|m| m.target == topic)
            .map(|m| serde_json::from_str(&m.body).unwrap())
            .collect()
    }

    pub fn group_results(&self, group_id: &str) -> Vec<GroupResult> {
        self.published::<GroupResult>(&self.sp.config.internal_topics.group_results)
            .into_iter()
            .filter(|r| r.group_id == group_id)
            .collect()
    }

    /// The completion of `group_id`, asserting it was published exactly once.
    pub fn completion(&self, group_id: &str) -> GroupResult {
        let mut completions: Vec<_> = self
            .group_results(group_id)
            .into_iter()
            .filter(GroupResult::is_terminal)
            .collect();
        assert_eq!(completions.len(), 1, "completions of group {group_id}");
        completions.remove(0)
    }

    pub fn is_completed(&self, group_id: &str) -> bool {
        self.group_results(group_id).iter().any(GroupResult::is_terminal)
    }
}
