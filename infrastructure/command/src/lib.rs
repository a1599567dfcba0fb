//! Commands to interact with storage workers

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Work handed to the storage worker of one destination backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageJob {
    /// Request the worker reports back about.
    pub request_id: Uuid,
    /// Destination storage identifier.
    pub storage: String,
    pub checksum: String,
    pub algorithm: String,
    pub file_name: String,
    pub size: u64,
    pub mime_type: String,
    /// Path inside the destination backend.
    pub destination_path: String,
    pub kind: JobKind,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum JobKind {
    /// Write the file to the destination.
    Store { source: JobSource },
    /// Remove the file at `url` from the destination.
    Delete { url: String },
    /// Drop an expired cache copy, nothing is reported back.
    Evict { url: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", tag = "from")]
pub enum JobSource {
    /// Bytes are fetched from the url the producer declared.
    Origin { url: String },
    /// Bytes are read from an already stored copy.
    Copy {
        source_storage: String,
        source_checksum: String,
        url: String,
    },
}

/// Result of one job, sent back by the worker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerReport {
    pub request_id: Uuid,
    pub outcome: WorkerOutcome,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum WorkerOutcome {
    /// File written, reachable at `url`.
    Stored { url: String, size: u64 },
    /// File removed from the backend.
    Deleted,
    /// Transport or storage failure.
    Failed { cause: String },
}

impl WorkerReport {
    pub fn stored(request_id: Uuid, url: impl Into<String>, size: u64) -> Self {
        Self {
            request_id,
            outcome: WorkerOutcome::Stored {
                url: url.into(),
                size,
            },
        }
    }

    pub fn deleted(request_id: Uuid) -> Self {
        Self {
            request_id,
            outcome: WorkerOutcome::Deleted,
        }
    }

    pub fn failed(request_id: Uuid, cause: impl Into<String>) -> Self {
        Self {
            request_id,
            outcome: WorkerOutcome::Failed {
                cause: cause.into(),
            },
        }
    }
}
