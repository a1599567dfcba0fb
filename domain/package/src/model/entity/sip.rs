use archival_architecture::model::AggregateRoot;
use chrono::{DateTime, Utc};
use domain_storage::command::{StorageRequest, AUTO_STORAGE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::model::vo::SipState;

/// A package as submitted by a provider.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sip {
    pub id: Uuid,
    pub provider_id: String,
    pub session_owner: String,
    pub session: String,
    #[serde(default)]
    pub state: SipState,
    pub files: Vec<PackageFile>,
    /// Descriptive metadata, also read by allocation strategies.
    #[serde(default)]
    pub metadata: Value,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl AggregateRoot for Sip {
    type Id = Uuid;
}

fn auto_storage() -> String {
    AUTO_STORAGE.to_owned()
}

fn rawdata() -> String {
    "RAWDATA".to_owned()
}

/// One content file of a package.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageFile {
    pub file_name: String,
    pub checksum: String,
    pub algorithm: String,
    pub mime_type: String,
    pub size: u64,
    pub origin_url: String,
    /// Destination storage, allocated by the configured strategy when `auto`.
    #[serde(default = "auto_storage")]
    pub storage: String,
    #[serde(default)]
    pub sub_directory: Option<String>,
    #[serde(default = "rawdata")]
    pub r#type: String,
    #[serde(default)]
    pub quicklook: bool,
    #[serde(default)]
    pub online_mandatory: bool,
}

impl PackageFile {
    pub fn storage_request(
        &self,
        owner: &str,
        session_owner: &str,
        session: &str,
        metadata: &Value,
    ) -> StorageRequest {
        StorageRequest {
            file_name: self.file_name.to_owned(),
            checksum: self.checksum.to_owned(),
            algorithm: self.algorithm.to_owned(),
            mime_type: self.mime_type.to_owned(),
            file_size: self.size,
            owner: owner.to_owned(),
            origin_url: self.origin_url.to_owned(),
            storage: self.storage.to_owned(),
            sub_directory: self.sub_directory.to_owned(),
            session_owner: session_owner.to_owned(),
            session: session.to_owned(),
            r#type: self.r#type.to_owned(),
            height: None,
            width: None,
            quicklook: self.quicklook,
            online_mandatory: self.online_mandatory,
            metadata: metadata.clone(),
        }
    }
}
