use async_trait::async_trait;
use infrastructure_command::WorkerOutcome;
use uuid::Uuid;

use crate::{command::FileOperationRequest, exception::FileRequestResult};

/// Turns batches of file operations into requests and drives them to a terminal state.
#[async_trait]
pub trait RequestDispatchService: Send + Sync {
    /// Accept a batch correlated by `group_id`.
    ///
    /// Returns without waiting for any storage I/O. Invalid or unallocatable
    /// entries become failed requests of the group.
    async fn submit(
        &self,
        group_id: &str,
        requests: Vec<FileOperationRequest>,
    ) -> FileRequestResult<()>;

    /// Send the TO_DO requests to their storage workers, returns how many went.
    async fn dispatch_ready(&self) -> FileRequestResult<usize>;

    /// Apply a worker result. Duplicated or late results are ignored.
    async fn on_worker_result(
        &self,
        request_id: Uuid,
        outcome: WorkerOutcome,
    ) -> FileRequestResult<()>;

    /// Re-queue delayed requests whose storage is available again.
    async fn sweep_delayed(&self) -> FileRequestResult<usize>;

    /// Fail the requests running for longer than the staleness threshold.
    async fn surface_stale(&self) -> FileRequestResult<usize>;

    /// Clone the failed requests of `group_id` back to TO_DO under `new_group_id`.
    async fn retry_group(&self, group_id: &str, new_group_id: &str) -> FileRequestResult<usize>;

    /// Clone the failed requests of `owners` back to TO_DO under `new_group_id`.
    async fn retry_owners(
        &self,
        owners: &[String],
        new_group_id: &str,
    ) -> FileRequestResult<usize>;

    /// Forget the expired cache copies and evict them from the cache backend.
    async fn purge_cache(&self) -> FileRequestResult<usize>;
}
