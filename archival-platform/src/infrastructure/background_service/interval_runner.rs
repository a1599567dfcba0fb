use std::{sync::Arc, time::Duration};

use archival_architecture::hosting::BackgroundService;
use domain_storage::service::{RequestDispatchService, RequestGroupService};
use tokio::time::interval;
use tracing::Instrument;

/// Sends the TO_DO requests to their storage workers.
pub struct DispatchRunner {
    dispatch_service: Arc<dyn RequestDispatchService>,
    interval: Duration,
}

#[async_trait::async_trait]
impl BackgroundService for DispatchRunner {
    async fn run(&self) {
        let mut interval = interval(self.interval);
        loop {
            interval.tick().await;
            let service = self.dispatch_service.clone();
            tokio::spawn(
                async move {
                    match service.dispatch_ready().await {
                        Ok(0) => {}
                        Ok(sent) => tracing::debug!("{sent} requests dispatched."),
                        Err(e) => tracing::error!("Dispatch pass failed: {e}"),
                    }
                }
                .instrument(tracing::trace_span!("dispatch_runner")),
            );
        }
    }
}

impl DispatchRunner {
    pub fn new(interval: u64, dispatch_service: Arc<dyn RequestDispatchService>) -> Self {
        Self {
            dispatch_service,
            interval: Duration::from_secs(interval.max(1)),
        }
    }
}

/// Releases delayed requests, surfaces lost ones, purges the cache and completes groups.
pub struct MaintenanceRunner {
    dispatch_service: Arc<dyn RequestDispatchService>,
    group_service: Arc<dyn RequestGroupService>,
    interval: Duration,
}

#[async_trait::async_trait]
impl BackgroundService for MaintenanceRunner {
    async fn run(&self) {
        let mut interval = interval(self.interval);
        loop {
            interval.tick().await;
            let dispatch_service = self.dispatch_service.clone();
            let group_service = self.group_service.clone();
            tokio::spawn(
                async move {
                    if let Err(e) = dispatch_service.sweep_delayed().await {
                        tracing::error!("Delayed requests sweep failed: {e}");
                    }
                    if let Err(e) = dispatch_service.surface_stale().await {
                        tracing::error!("Stale requests check failed: {e}");
                    }
                    if let Err(e) = dispatch_service.purge_cache().await {
                        tracing::error!("Cache purge failed: {e}");
                    }
                    match group_service.check_all_groups().await {
                        Ok(0) => {}
                        Ok(published) => tracing::info!("{published} request groups completed."),
                        Err(e) => tracing::error!("Request groups check failed: {e}"),
                    }
                }
                .instrument(tracing::trace_span!("maintenance_runner")),
            );
        }
    }
}

impl MaintenanceRunner {
    pub fn new(
        interval: u64,
        dispatch_service: Arc<dyn RequestDispatchService>,
        group_service: Arc<dyn RequestGroupService>,
    ) -> Self {
        Self {
            dispatch_service,
            group_service,
            interval: Duration::from_secs(interval.max(1)),
        }
    }
}
