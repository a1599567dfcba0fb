use serde::{Deserialize, Serialize};

/// Description of one file handed to an allocation strategy.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileToAllocate {
    pub checksum: String,
    pub algorithm: String,
    pub file_name: String,
    pub size: u64,
    /// Domain tag of the file, e.g. RAWDATA or THUMBNAIL.
    pub r#type: String,
    pub origin_url: String,
    /// Quicklooks are only ever read online.
    pub quicklook: bool,
    /// At least one destination must support online retrieval.
    pub online_mandatory: bool,
    /// Metadata tree of the package the file belongs to.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// One destination chosen by an allocation strategy.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct StorageTarget {
    pub storage: String,
    pub sub_directory: Option<String>,
}

impl StorageTarget {
    pub fn new(storage: impl Into<String>) -> Self {
        Self {
            storage: storage.into(),
            sub_directory: None,
        }
    }

    pub fn with_sub_directory(storage: impl Into<String>, sub_directory: Option<String>) -> Self {
        Self {
            storage: storage.into(),
            sub_directory: sub_directory.filter(|d| !d.is_empty()),
        }
    }
}
