use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    exception::{FileRequestException, FileRequestResult},
    model::{
        entity::FileReferenceMetaInfo,
        vo::{check_checksum, FileRequestType, FileToAllocate},
    },
};

/// Storage value letting the configured allocation strategy choose destinations.
pub const AUTO_STORAGE: &str = "auto";

/// Storage of the temporary copies made by availability requests.
pub const CACHE_STORAGE: &str = "cache";

const MAX_EXPIRATION_HOURS: i64 = 24 * 365 * 10;

fn default_file_type() -> String {
    "RAWDATA".to_owned()
}

/// Store a file fetched from `origin_url`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageRequest {
    pub file_name: String,
    pub checksum: String,
    pub algorithm: String,
    pub mime_type: String,
    pub file_size: u64,
    pub owner: String,
    pub origin_url: String,
    /// A storage location id, or [`AUTO_STORAGE`].
    pub storage: String,
    pub sub_directory: Option<String>,
    pub session_owner: String,
    pub session: String,
    #[serde(default = "default_file_type")]
    pub r#type: String,
    pub height: Option<u32>,
    pub width: Option<u32>,
    #[serde(default)]
    pub quicklook: bool,
    #[serde(default)]
    pub online_mandatory: bool,
    /// Metadata of the package the file belongs to.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Remove `owner` from a stored file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeletionRequest {
    pub checksum: String,
    pub storage: String,
    pub owner: String,
    /// Forget the file even when the physical deletion fails.
    #[serde(default)]
    pub force_delete: bool,
    pub session_owner: String,
    pub session: String,
}

/// Copy an already stored file to another storage location.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CopyRequest {
    pub checksum: String,
    pub storage: String,
    pub sub_directory: Option<String>,
    pub session_owner: String,
    pub session: String,
}

/// Record a file already present at `url`, no transfer happens.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRequest {
    pub file_name: String,
    pub checksum: String,
    pub algorithm: String,
    pub mime_type: String,
    pub file_size: u64,
    pub owner: String,
    pub storage: String,
    pub url: String,
    pub session_owner: String,
    pub session: String,
    #[serde(default = "default_file_type")]
    pub r#type: String,
}

/// Make a stored file readable, restoring it to the cache when no online
/// location holds it.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub checksum: String,
    /// How long a restored copy stays in the cache, the configured default when absent.
    pub expiration_hours: Option<i64>,
    pub session_owner: String,
    pub session: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", tag = "operation")]
pub enum FileOperationRequest {
    Storage(StorageRequest),
    Deletion(DeletionRequest),
    Copy(CopyRequest),
    Reference(ReferenceRequest),
    Availability(AvailabilityRequest),
}

/// A batch of file operations whose outcomes are reported together.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupRequestCommand {
    pub group_id: String,
    pub requests: Vec<FileOperationRequest>,
}

fn require(value: &str, field: &str) -> FileRequestResult<()> {
    if value.trim().is_empty() {
        return Err(FileRequestException::Validation {
            reason: format!("{field} is mandatory"),
        });
    }
    Ok(())
}

fn require_url(value: &str) -> FileRequestResult<()> {
    Url::parse(value).map_err(|e| FileRequestException::InvalidUrl {
        url: value.to_owned(),
        reason: e.to_string(),
    })?;
    Ok(())
}

impl StorageRequest {
    pub fn validate(&self) -> FileRequestResult<()> {
        require(&self.checksum, "checksum")?;
        require(&self.storage, "storage")?;
        require(&self.owner, "owner")?;
        require(&self.session_owner, "sessionOwner")?;
        require(&self.file_name, "fileName")?;
        check_checksum(&self.checksum, &self.algorithm)?;
        require_url(&self.origin_url)
    }

    pub fn meta_info(&self) -> FileReferenceMetaInfo {
        FileReferenceMetaInfo {
            checksum: self.checksum.to_owned(),
            algorithm: self.algorithm.to_owned(),
            file_name: self.file_name.to_owned(),
            mime_type: self.mime_type.to_owned(),
            file_size: self.file_size,
            height: self.height,
            width: self.width,
            r#type: self.r#type.to_owned(),
        }
    }

    pub fn to_allocate(&self) -> FileToAllocate {
        FileToAllocate {
            checksum: self.checksum.to_owned(),
            algorithm: self.algorithm.to_owned(),
            file_name: self.file_name.to_owned(),
            size: self.file_size,
            r#type: self.r#type.to_owned(),
            origin_url: self.origin_url.to_owned(),
            quicklook: self.quicklook,
            online_mandatory: self.online_mandatory,
            metadata: self.metadata.clone(),
        }
    }
}

impl DeletionRequest {
    pub fn validate(&self) -> FileRequestResult<()> {
        require(&self.checksum, "checksum")?;
        require(&self.storage, "storage")?;
        require(&self.owner, "owner")?;
        require(&self.session_owner, "sessionOwner")
    }
}

impl CopyRequest {
    pub fn validate(&self) -> FileRequestResult<()> {
        require(&self.checksum, "checksum")?;
        require(&self.storage, "storage")?;
        require(&self.session_owner, "sessionOwner")
    }
}

impl ReferenceRequest {
    pub fn validate(&self) -> FileRequestResult<()> {
        require(&self.checksum, "checksum")?;
        require(&self.storage, "storage")?;
        require(&self.owner, "owner")?;
        require(&self.session_owner, "sessionOwner")?;
        check_checksum(&self.checksum, &self.algorithm)?;
        require_url(&self.url)
    }

    pub fn meta_info(&self) -> FileReferenceMetaInfo {
        FileReferenceMetaInfo {
            checksum: self.checksum.to_owned(),
            algorithm: self.algorithm.to_owned(),
            file_name: self.file_name.to_owned(),
            mime_type: self.mime_type.to_owned(),
            file_size: self.file_size,
            height: None,
            width: None,
            r#type: self.r#type.to_owned(),
        }
    }
}

impl AvailabilityRequest {
    pub fn validate(&self) -> FileRequestResult<()> {
        require(&self.checksum, "checksum")?;
        require(&self.session_owner, "sessionOwner")?;
        match self.expiration_hours {
            Some(hours) if !(1..=MAX_EXPIRATION_HOURS).contains(&hours) => {
                Err(FileRequestException::Validation {
                    reason: format!("expirationHours must be within 1 and {MAX_EXPIRATION_HOURS}, got {hours}"),
                })
            }
            _ => Ok(()),
        }
    }
}

impl FileOperationRequest {
    pub fn r#type(&self) -> FileRequestType {
        match self {
            Self::Storage(_) => FileRequestType::Storage,
            Self::Deletion(_) => FileRequestType::Deletion,
            Self::Copy(_) => FileRequestType::Copy,
            Self::Reference(_) => FileRequestType::Reference,
            Self::Availability(_) => FileRequestType::Availability,
        }
    }

    pub fn checksum(&self) -> &str {
        match self {
            Self::Storage(r) => &r.checksum,
            Self::Deletion(r) => &r.checksum,
            Self::Copy(r) => &r.checksum,
            Self::Reference(r) => &r.checksum,
            Self::Availability(r) => &r.checksum,
        }
    }

    pub fn storage(&self) -> &str {
        match self {
            Self::Storage(r) => &r.storage,
            Self::Deletion(r) => &r.storage,
            Self::Copy(r) => &r.storage,
            Self::Reference(r) => &r.storage,
            Self::Availability(_) => CACHE_STORAGE,
        }
    }

    pub fn owner(&self) -> Option<&str> {
        match self {
            Self::Storage(r) => Some(&r.owner),
            Self::Deletion(r) => Some(&r.owner),
            Self::Copy(_) | Self::Availability(_) => None,
            Self::Reference(r) => Some(&r.owner),
        }
    }

    pub fn session(&self) -> (&str, &str) {
        match self {
            Self::Storage(r) => (&r.session_owner, &r.session),
            Self::Deletion(r) => (&r.session_owner, &r.session),
            Self::Copy(r) => (&r.session_owner, &r.session),
            Self::Reference(r) => (&r.session_owner, &r.session),
            Self::Availability(r) => (&r.session_owner, &r.session),
        }
    }

    pub fn validate(&self) -> FileRequestResult<()> {
        match self {
            Self::Storage(r) => r.validate(),
            Self::Deletion(r) => r.validate(),
            Self::Copy(r) => r.validate(),
            Self::Reference(r) => r.validate(),
            Self::Availability(r) => r.validate(),
        }
    }
}
