use async_trait::async_trait;
use domain_storage::model::vo::GroupResult;
use uuid::Uuid;

use crate::{exception::PackageResult, model::entity::Sip};

/// Drives packages from submission to storage and deletion.
#[async_trait]
pub trait PackageLifecycleService: Send + Sync {
    /// Register a submitted package and create its AIP, returns the AIP id.
    async fn ingest(&self, sip: Sip) -> PackageResult<Uuid>;

    /// Submit the storage of every file of a CREATED AIP.
    async fn request_storage(&self, aip_id: Uuid) -> PackageResult<()>;

    /// Submit the storage again after a denied or failed one.
    async fn retry_storage(&self, aip_id: Uuid) -> PackageResult<()>;

    /// Submit the deletion of every stored copy of the AIP files.
    async fn request_deletion(&self, aip_id: Uuid, force_delete: bool) -> PackageResult<()>;

    /// Advance the AIP correlated with the group of `result`.
    async fn on_group_result(&self, result: GroupResult) -> PackageResult<()>;
}
