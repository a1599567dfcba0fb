use archival_architecture::model::AggregateRoot;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Bookkeeping of a caller-correlated batch.
///
/// Completion is always derived from the member requests, `open_batches` keeps
/// a group from completing while a submission is still registering requests and
/// `published` only records that the completion message went out.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestGroup {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Batches of this group whose requests are still being registered.
    pub open_batches: u32,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
}

impl AggregateRoot for RequestGroup {
    type Id = String;
}

impl RequestGroup {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            created_at: Utc::now(),
            open_batches: 0,
            published: false,
            published_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, expiration: Duration) -> bool {
        !self.published && now - self.created_at > expiration
    }

    /// Every batch submitted to the group is registered.
    pub fn is_sealed(&self) -> bool {
        self.open_batches == 0
    }

    pub fn mark_published(&mut self) {
        self.published = true;
        self.published_at = Some(Utc::now());
    }
}
