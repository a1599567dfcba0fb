use std::sync::Arc;

use archival_architecture::message_queue::producer::MessageQueueProducerTemplate;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use domain_storage::{
    exception::FileRequestResult,
    model::{
        entity::{FileReference, FileRequest, RequestGroup, RequestResultInfo},
        vo::{FileRequestStatus, GroupResult},
    },
    repository::{FileRequestRepo, RequestGroupRepo, RequestResultInfoRepo},
    service::RequestGroupService,
};
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use crate::lock::{file_key, group_key, KeyedLock};

pub const GROUP_EXPIRED_CAUSE: &str = "Associated group request expired.";

#[derive(TypedBuilder)]
pub struct RequestGroupServiceImpl {
    group_repo: Arc<dyn RequestGroupRepo>,
    request_repo: Arc<dyn FileRequestRepo>,
    result_repo: Arc<dyn RequestResultInfoRepo>,
    result_producer: Arc<dyn MessageQueueProducerTemplate<GroupResult>>,
    result_topic: String,
    locks: Arc<KeyedLock>,
    /// Groups left incomplete for longer are failed, `None` never expires them.
    #[builder(default = Some(Duration::days(2)))]
    expiration: Option<Duration>,
    #[builder(default = 100)]
    max_groups_per_pass: usize,
}

impl RequestGroupServiceImpl {
    async fn publish(&self, result: &GroupResult) -> FileRequestResult<()> {
        self.result_producer
            .send_object(result, &self.result_topic)
            .await?;
        Ok(())
    }

    /// Publish the completion of `group_id` once, when it is complete.
    ///
    /// An expired group is completed even with open batches, its members
    /// without a recorded outcome are reported without a file.
    async fn complete(&self, group_id: &str, expired: bool) -> FileRequestResult<bool> {
        let requests = {
            let _guard = self.locks.lock(group_key(group_id)).await;
            let Some(mut group) = self.group_repo.get_by_id(&group_id.to_owned()).await? else {
                return Ok(false);
            };
            if group.published {
                return Ok(true);
            }
            if !group.is_sealed() && !expired {
                return Ok(false);
            }
            let requests = self.request_repo.get_all_by_group(group_id).await?;
            if requests.iter().any(|r| !r.status.is_terminal()) {
                return Ok(false);
            }
            let mut results = self.result_repo.get_all_by_group(group_id).await?;
            for request in requests.iter() {
                if results.iter().any(|r| r.request_id == request.id) {
                    continue;
                }
                if !expired {
                    // Its outcome is on the way, the reporter checks the group again.
                    debug!("[GROUP {group_id}] Waiting for the outcome of request {}.", request.id);
                    return Ok(false);
                }
                results.push(RequestResultInfo::new(group_id, request, None));
            }

            let result = GroupResult::completed(group_id, results);
            self.publish(&result).await?;
            group.mark_published();
            self.group_repo.update(&group).await?;
            self.result_repo.delete_all_by_group(group_id).await?;
            info!(
                "[GROUP {group_id}] Completed with status {:?} for {} requests.",
                result.status,
                result.results.len()
            );
            requests
        };
        self.release(group_id, requests).await?;
        Ok(true)
    }

    /// Detach a published group from its successful requests.
    ///
    /// Failed requests stay around to be retried.
    async fn release(&self, group_id: &str, requests: Vec<FileRequest>) -> FileRequestResult<()> {
        for request in requests
            .into_iter()
            .filter(|r| r.status == FileRequestStatus::Success)
        {
            let _guard = self.locks.lock(file_key(&request.checksum, &request.storage)).await;
            let Some(mut request) = self.request_repo.get_by_id(&request.id).await? else {
                continue;
            };
            request.group_ids.remove(group_id);
            if request.group_ids.is_empty() {
                self.request_repo.delete_by_id(&request.id).await?;
            } else {
                self.request_repo.update(&request).await?;
            }
        }
        Ok(())
    }

    /// Fail every request of the group still in progress.
    async fn expire(&self, group_id: &str) -> FileRequestResult<()> {
        let mut expired = 0;
        for request in self.request_repo.get_all_by_group(group_id).await? {
            if request.status.is_terminal() {
                continue;
            }
            let _guard = self.locks.lock(file_key(&request.checksum, &request.storage)).await;
            let mut request = match self.request_repo.get_by_id(&request.id).await? {
                Some(request) if !request.status.is_terminal() => request,
                _ => continue,
            };
            request.fail(GROUP_EXPIRED_CAUSE)?;
            self.request_repo.update(&request).await?;
            self.request_done(&request, None).await?;
            expired += 1;
        }
        warn!("[GROUP {group_id}] Expired, {expired} requests failed.");
        Ok(())
    }
}

#[async_trait]
impl RequestGroupService for RequestGroupServiceImpl {
    async fn open(&self, group_id: &str, size: usize) -> FileRequestResult<bool> {
        let _guard = self.locks.lock(group_key(group_id)).await;
        if size == 0 {
            self.publish(&GroupResult::denied(group_id, "Request group is empty."))
                .await?;
            return Ok(false);
        }
        match self.group_repo.get_by_id(&group_id.to_owned()).await? {
            Some(group) if group.published => {
                warn!("[GROUP {group_id}] Denied, the group id was already used.");
                self.publish(&GroupResult::denied(
                    group_id,
                    "Request group id already used.",
                ))
                .await?;
                Ok(false)
            }
            Some(mut group) => {
                // New requests join a group still in progress.
                group.open_batches += 1;
                self.group_repo.update(&group).await?;
                debug!("[GROUP {group_id}] {size} more requests, {} batches open.", group.open_batches);
                Ok(true)
            }
            None => {
                let mut group = RequestGroup::new(group_id);
                group.open_batches = 1;
                self.group_repo.insert(&group).await?;
                self.publish(&GroupResult::granted(group_id)).await?;
                debug!("[GROUP {group_id}] Granted for {size} requests.");
                Ok(true)
            }
        }
    }

    async fn request_done(
        &self,
        request: &FileRequest,
        result_file: Option<FileReference>,
    ) -> FileRequestResult<()> {
        if !request.status.is_terminal() {
            return Ok(());
        }
        for group_id in request.group_ids.iter() {
            let _guard = self.locks.lock(group_key(group_id)).await;
            match self.group_repo.get_by_id(group_id).await? {
                Some(group) if !group.published => {}
                _ => {
                    debug!("[GROUP {group_id}] Closed, outcome of request {} not recorded.", request.id);
                    continue;
                }
            }
            if self.result_repo.exists(group_id, request.id).await? {
                continue;
            }
            let info = RequestResultInfo::new(group_id, request, result_file.as_ref());
            self.result_repo.insert(&info).await?;
        }
        Ok(())
    }

    async fn seal(&self, group_id: &str) -> FileRequestResult<bool> {
        {
            let _guard = self.locks.lock(group_key(group_id)).await;
            if let Some(mut group) = self.group_repo.get_by_id(&group_id.to_owned()).await? {
                if !group.published && group.open_batches > 0 {
                    group.open_batches -= 1;
                    self.group_repo.update(&group).await?;
                }
            }
        }
        self.complete(group_id, false).await
    }

    async fn check_group_completion(&self, group_id: &str) -> FileRequestResult<bool> {
        self.complete(group_id, false).await
    }

    async fn check_all_groups(&self) -> FileRequestResult<usize> {
        let now = Utc::now();
        let mut published = 0;
        for group in self.group_repo.get_unpublished(self.max_groups_per_pass).await? {
            let expired = self
                .expiration
                .is_some_and(|expiration| group.is_expired(now, expiration));
            if expired {
                self.expire(&group.id).await?;
            }
            if self.complete(&group.id, expired).await? {
                published += 1;
            }
        }
        self.locks.prune();
        Ok(published)
    }
}
