use async_trait::async_trait;

use crate::{
    exception::FileRequestResult,
    model::entity::{FileReference, FileRequest},
};

/// Correlates request outcomes into one result per group.
#[async_trait]
pub trait RequestGroupService: Send + Sync {
    /// Register a batch of `size` requests, publishing GRANTED or DENIED.
    ///
    /// Returns whether the batch was granted. A granted batch keeps its group
    /// open until the matching [`seal`](Self::seal).
    async fn open(&self, group_id: &str, size: usize) -> FileRequestResult<bool>;

    /// Record the outcome of a terminal request for each of its groups.
    ///
    /// Called right after the terminal transition, before the lock of the
    /// request's file is released or while its batch is still open. Groups
    /// already published are skipped.
    async fn request_done(
        &self,
        request: &FileRequest,
        result_file: Option<FileReference>,
    ) -> FileRequestResult<()>;

    /// Close a batch opened by [`open`](Self::open), then check the group completion.
    async fn seal(&self, group_id: &str) -> FileRequestResult<bool>;

    /// Publish the result of a group with no open batch once every member
    /// request is terminal and its outcome recorded.
    ///
    /// Publishes at most once per group, returns whether the group is complete.
    async fn check_group_completion(&self, group_id: &str) -> FileRequestResult<bool>;

    /// Expire outdated groups and complete the finished ones.
    async fn check_all_groups(&self) -> FileRequestResult<usize>;
}
