use std::{collections::HashMap, sync::Arc};

use domain_package::model::{entity::Sip, vo::AipChangeMsg};
use domain_storage::{command::GroupRequestCommand, model::vo::GroupResult};
use infrastructure_command::{StorageJob, WorkerReport};

use super::{
    config::InternalTopics,
    message_queue::{ConsumerFn, ConsumerReturn},
    ServiceProvider,
};

pub fn file_request_consumer(content: String, sp: Arc<ServiceProvider>) -> ConsumerReturn {
    Box::pin(async move {
        let command: GroupRequestCommand = serde_json::from_str(&content)?;
        sp.dispatch_service
            .submit(&command.group_id, command.requests)
            .await?;
        Ok(())
    })
}

pub fn sip_submission_consumer(content: String, sp: Arc<ServiceProvider>) -> ConsumerReturn {
    Box::pin(async move {
        let sip: Sip = serde_json::from_str(&content)?;
        let aip_id = sp.package_service.ingest(sip).await?;
        sp.package_service.request_storage(aip_id).await?;
        Ok(())
    })
}

pub fn storage_job_consumer(content: String, sp: Arc<ServiceProvider>) -> ConsumerReturn {
    Box::pin(async move {
        let job: StorageJob = serde_json::from_str(&content)?;
        sp.storage_worker.run_job(job).await
    })
}

pub fn worker_report_consumer(content: String, sp: Arc<ServiceProvider>) -> ConsumerReturn {
    Box::pin(async move {
        let report: WorkerReport = serde_json::from_str(&content)?;
        sp.dispatch_service
            .on_worker_result(report.request_id, report.outcome)
            .await?;
        Ok(())
    })
}

pub fn group_result_consumer(content: String, sp: Arc<ServiceProvider>) -> ConsumerReturn {
    Box::pin(async move {
        let result: GroupResult = serde_json::from_str(&content)?;
        sp.package_service.on_group_result(result).await?;
        Ok(())
    })
}

pub fn package_change_consumer(content: String, _sp: Arc<ServiceProvider>) -> ConsumerReturn {
    Box::pin(async move {
        let msg: AipChangeMsg = serde_json::from_str(&content)?;
        match msg.message {
            Some(message) => tracing::info!("[AIP {}] Now {}: {message}", msg.aip_id, msg.state),
            None => tracing::info!("[AIP {}] Now {}.", msg.aip_id, msg.state),
        }
        Ok(())
    })
}

/// Consumers of the engine events, handled in arrival order.
pub fn event_consumers(topics: &InternalTopics) -> HashMap<String, ConsumerFn<ServiceProvider>> {
    let mut consumers: HashMap<String, ConsumerFn<ServiceProvider>> = HashMap::new();
    consumers.insert(topics.file_requests.to_owned(), file_request_consumer);
    consumers.insert(topics.sip_submissions.to_owned(), sip_submission_consumer);
    consumers.insert(topics.worker_reports.to_owned(), worker_report_consumer);
    consumers.insert(topics.group_results.to_owned(), group_result_consumer);
    consumers.insert(topics.package_changes.to_owned(), package_change_consumer);
    consumers
}

pub fn job_consumers(topics: &InternalTopics) -> HashMap<String, ConsumerFn<ServiceProvider>> {
    let mut consumers: HashMap<String, ConsumerFn<ServiceProvider>> = HashMap::new();
    consumers.insert(topics.storage_jobs.to_owned(), storage_job_consumer);
    consumers
}
