use std::sync::Arc;

use archival_architecture::message_queue::producer::MessageQueueProducerTemplate;
use async_trait::async_trait;
use domain_package::{
    exception::{PackageException, PackageResult},
    model::{
        entity::{Aip, Sip},
        vo::{AipChangeMsg, AipState, SipState},
    },
    repository::{AipRepo, SipRepo},
    service::PackageLifecycleService,
};
use domain_storage::{
    command::FileOperationRequest,
    model::vo::{GroupResult, GroupStatus},
    service::RequestDispatchService,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

#[derive(TypedBuilder)]
pub struct PackageLifecycleServiceImpl {
    sip_repo: Arc<dyn SipRepo>,
    aip_repo: Arc<dyn AipRepo>,
    dispatch_service: Arc<dyn RequestDispatchService>,
    change_producer: Arc<dyn MessageQueueProducerTemplate<AipChangeMsg>>,
    change_topic: String,
    /// Serializes AIP state changes.
    #[builder(default)]
    transitions: Mutex<()>,
}

impl PackageLifecycleServiceImpl {
    async fn get_aip(&self, id: Uuid) -> PackageResult<Aip> {
        self.aip_repo
            .get_by_id(&id)
            .await?
            .ok_or(PackageException::NoSuchAip { id })
    }

    /// Persist the AIP, publish its change and let its SIP follow.
    async fn save(&self, aip: &Aip) -> PackageResult<()> {
        self.aip_repo.update(aip).await?;
        let msg = AipChangeMsg {
            aip_id: aip.id,
            sip_id: aip.sip_id,
            state: aip.state,
            message: aip.error_message.to_owned(),
        };
        self.change_producer
            .send_object(&msg, &self.change_topic)
            .await?;

        let state = match aip.state {
            AipState::Stored => SipState::Stored,
            AipState::StorageError | AipState::StorageRequestDenied => SipState::StoreError,
            AipState::Deleted => SipState::Deleted,
            _ => return Ok(()),
        };
        if let Some(mut sip) = self.sip_repo.get_by_id(&aip.sip_id).await? {
            if sip.state != state {
                sip.state = state;
                self.sip_repo.update(&sip).await?;
            }
        }
        Ok(())
    }

    /// Submit `requests` in `group_id`, the AIP goes to `denied` when they are refused.
    async fn submit(
        &self,
        aip: &mut Aip,
        group_id: &str,
        requests: Vec<FileOperationRequest>,
        denied: AipState,
    ) -> PackageResult<()> {
        if let Err(e) = self.dispatch_service.submit(group_id, requests).await {
            error!("[AIP {}] Cannot submit group {group_id}: {e}", aip.id);
            aip.transition(denied)?;
            aip.error_message = Some(e.to_string());
            self.save(aip).await?;
            return Err(e.into());
        }
        Ok(())
    }

    async fn submit_storage(&self, mut aip: Aip) -> PackageResult<()> {
        if aip.files.is_empty() {
            return Err(PackageException::EmptyPackage { id: aip.id });
        }
        let group_id = Uuid::new_v4().to_string();
        aip.storage_group_id = Some(group_id.to_owned());
        aip.deletion_group_id = None;
        aip.error_message = None;
        self.aip_repo.update(&aip).await?;
        info!(
            "[AIP {}] Storage of {} files requested in group {group_id}.",
            aip.id,
            aip.files.len()
        );
        let requests = aip.storage_requests();
        self.submit(&mut aip, &group_id, requests, AipState::StorageRequestDenied)
            .await
    }
}

#[async_trait]
impl PackageLifecycleService for PackageLifecycleServiceImpl {
    async fn ingest(&self, mut sip: Sip) -> PackageResult<Uuid> {
        if sip.files.is_empty() {
            return Err(PackageException::EmptyPackage { id: sip.id });
        }
        sip.state = SipState::AipCreated;
        let aip = Aip::from_sip(&sip);
        self.sip_repo.insert(&sip).await?;
        self.aip_repo.insert(&aip).await?;
        self.change_producer
            .send_object(
                &AipChangeMsg {
                    aip_id: aip.id,
                    sip_id: sip.id,
                    state: aip.state,
                    message: None,
                },
                &self.change_topic,
            )
            .await?;
        info!("[SIP {}] Ingested as AIP {}.", sip.id, aip.id);
        Ok(aip.id)
    }

    async fn request_storage(&self, aip_id: Uuid) -> PackageResult<()> {
        let _guard = self.transitions.lock().await;
        let aip = self.get_aip(aip_id).await?;
        if aip.state != AipState::Created {
            return Err(PackageException::InvalidTransition {
                id: aip.id,
                from: aip.state,
                to: AipState::StorageRequestGranted,
            });
        }
        self.submit_storage(aip).await
    }

    async fn retry_storage(&self, aip_id: Uuid) -> PackageResult<()> {
        let _guard = self.transitions.lock().await;
        let aip = self.get_aip(aip_id).await?;
        if !matches!(
            aip.state,
            AipState::StorageRequestDenied | AipState::StorageError
        ) {
            return Err(PackageException::InvalidTransition {
                id: aip.id,
                from: aip.state,
                to: AipState::StorageRequestGranted,
            });
        }
        self.submit_storage(aip).await
    }

    async fn request_deletion(&self, aip_id: Uuid, force_delete: bool) -> PackageResult<()> {
        let _guard = self.transitions.lock().await;
        let mut aip = self.get_aip(aip_id).await?;
        aip.transition(AipState::ToBeDeleted)?;
        aip.error_message = None;
        let requests = aip.deletion_requests(force_delete);
        if requests.is_empty() {
            // Nothing was ever stored.
            aip.storage_group_id = None;
            aip.deletion_group_id = None;
            self.save(&aip).await?;
            aip.transition(AipState::DeletionRequestGranted)?;
            aip.transition(AipState::Deleted)?;
            return self.save(&aip).await;
        }
        let group_id = Uuid::new_v4().to_string();
        aip.storage_group_id = None;
        aip.deletion_group_id = Some(group_id.to_owned());
        self.save(&aip).await?;
        info!(
            "[AIP {}] Deletion of {} stored files requested in group {group_id}, force: {force_delete}.",
            aip.id,
            requests.len()
        );
        self.submit(&mut aip, &group_id, requests, AipState::DeletionRequestDenied)
            .await
    }

    async fn on_group_result(&self, result: GroupResult) -> PackageResult<()> {
        let _guard = self.transitions.lock().await;
        let Some(mut aip) = self.aip_repo.get_by_group_id(&result.group_id).await? else {
            debug!("No AIP waits for group {}.", result.group_id);
            return Ok(());
        };
        let storage = aip.storage_group_id.as_deref() == Some(result.group_id.as_str());
        let (granted, denied, done, failed) = if storage {
            (
                AipState::StorageRequestGranted,
                AipState::StorageRequestDenied,
                AipState::Stored,
                AipState::StorageError,
            )
        } else {
            (
                AipState::DeletionRequestGranted,
                AipState::DeletionRequestDenied,
                AipState::Deleted,
                AipState::DeletionRequestDenied,
            )
        };

        match result.status {
            GroupStatus::Granted => {
                if aip.state == granted {
                    return Ok(());
                }
                aip.transition(granted)?;
            }
            GroupStatus::Denied => {
                warn!("[AIP {}] Group {} denied.", aip.id, result.group_id);
                aip.transition(denied)?;
                aip.error_message = result.message.to_owned();
            }
            GroupStatus::Success | GroupStatus::Error => {
                // Completion can overtake the grant.
                if aip.state != granted {
                    aip.transition(granted)?;
                }
                aip.record_results(&result.results);
                if result.status == GroupStatus::Success {
                    aip.transition(done)?;
                } else {
                    aip.error_message = Aip::summarize_errors(&result.results);
                    aip.transition(failed)?;
                }
                info!("[AIP {}] Group {} completed, now {}.", aip.id, result.group_id, aip.state);
            }
        }
        self.save(&aip).await
    }
}
