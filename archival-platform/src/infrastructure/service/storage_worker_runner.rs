use std::{collections::HashMap, sync::Arc};

use anyhow::anyhow;
use archival_architecture::message_queue::producer::MessageQueueProducerTemplate;
use domain_storage::service::DataStorageService;
use infrastructure_command::{JobKind, JobSource, StorageJob, WorkerOutcome, WorkerReport};
use typed_builder::TypedBuilder;

use super::{checksum, OriginFetcher};

/// Executes storage jobs against the backends and reports their outcome.
#[derive(TypedBuilder)]
pub struct StorageWorkerRunner {
    storages: HashMap<String, Arc<dyn DataStorageService>>,
    fetcher: Arc<OriginFetcher>,
    report_producer: Arc<dyn MessageQueueProducerTemplate<WorkerReport>>,
    report_topic: String,
}

impl StorageWorkerRunner {
    pub fn backend(&self, storage: &str) -> anyhow::Result<&Arc<dyn DataStorageService>> {
        self.storages
            .get(storage)
            .ok_or_else(|| anyhow!("No backend for storage {storage}."))
    }

    /// Run `job`, its failure is reported, not returned.
    pub async fn run_job(&self, job: StorageJob) -> anyhow::Result<()> {
        if let JobKind::Evict { url } = &job.kind {
            return self.evict(&job.storage, url).await;
        }
        let outcome = match self.execute(&job).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    "[STORAGE WORKER {}] Job of request {} for file {} failed: {e}",
                    job.storage,
                    job.request_id,
                    job.checksum
                );
                WorkerOutcome::Failed {
                    cause: e.to_string(),
                }
            }
        };
        let report = WorkerReport {
            request_id: job.request_id,
            outcome,
        };
        self.report_producer
            .send_object(&report, &self.report_topic)
            .await
    }

    async fn execute(&self, job: &StorageJob) -> anyhow::Result<WorkerOutcome> {
        let backend = self.backend(&job.storage)?;
        match &job.kind {
            JobKind::Store { source } => {
                let content = match source {
                    JobSource::Origin { url } => self.fetcher.fetch(url).await?,
                    JobSource::Copy {
                        source_storage,
                        url,
                        ..
                    } => self.backend(source_storage)?.retrieve(url).await?,
                };
                checksum::verify(&job.algorithm, &job.checksum, &content)?;
                let size = content.len() as u64;
                let url = backend.store(&job.destination_path, content).await?;
                tracing::debug!(
                    "[STORAGE WORKER {}] File {} ({} bytes) written at {url}.",
                    job.storage,
                    job.checksum,
                    size
                );
                Ok(WorkerOutcome::Stored { url, size })
            }
            JobKind::Delete { url } | JobKind::Evict { url } => {
                backend.delete(url).await?;
                tracing::debug!("[STORAGE WORKER {}] {url} deleted.", job.storage);
                Ok(WorkerOutcome::Deleted)
            }
        }
    }

    /// Nobody waits for an eviction, a failure only leaves an unreferenced copy.
    async fn evict(&self, storage: &str, url: &str) -> anyhow::Result<()> {
        match self.backend(storage)?.delete(url).await {
            Ok(()) => tracing::debug!("[STORAGE WORKER {storage}] Expired copy {url} evicted."),
            Err(e) => tracing::warn!("[STORAGE WORKER {storage}] Cannot evict {url}: {e}"),
        }
        Ok(())
    }
}
