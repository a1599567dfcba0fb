use archival_architecture::model::AggregateRoot;
use serde::{Deserialize, Serialize};

/// An active storage backend configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StorageLocation {
    pub id: String,
    /// Lower value wins.
    pub priority: u32,
    /// Supports random access retrieval.
    pub online: bool,
    /// Disabled locations are temporarily unavailable.
    pub enabled: bool,
}

impl AggregateRoot for StorageLocation {
    type Id = String;
}

impl StorageLocation {
    pub fn new(id: impl Into<String>, priority: u32, online: bool) -> Self {
        Self {
            id: id.into(),
            priority,
            online,
            enabled: true,
        }
    }
}
