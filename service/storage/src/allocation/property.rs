use std::collections::{BTreeSet, HashMap};

use domain_storage::{
    exception::{FileRequestException, FileRequestResult},
    model::{
        entity::StorageLocation,
        vo::{FileToAllocate, StorageTarget},
    },
    service::AllocationStrategy,
};
use serde::Deserialize;

use super::resolve;

/// Destination picked from a field of the package metadata.
///
/// `pointer` is a JSON pointer into the metadata, its value is looked up in
/// `mapping`, `default` is used when the field is absent or unmapped.
pub struct PropertyMappingAllocationStrategy {
    options: PropertyMappingOptions,
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMappingOptions {
    pub pointer: String,
    pub mapping: HashMap<String, String>,
    #[serde(default)]
    pub default: Option<String>,
}

impl PropertyMappingAllocationStrategy {
    pub const ID: &'static str = "property-mapping";

    pub fn new(options: PropertyMappingOptions) -> Self {
        Self { options }
    }
}

impl AllocationStrategy for PropertyMappingAllocationStrategy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn select(
        &self,
        file: &FileToAllocate,
        locations: &[StorageLocation],
    ) -> FileRequestResult<BTreeSet<StorageTarget>> {
        let value = file.metadata.pointer(&self.options.pointer).and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.to_owned()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        });
        let storage = value
            .as_ref()
            .and_then(|v| self.options.mapping.get(v))
            .or(self.options.default.as_ref())
            .ok_or_else(|| FileRequestException::NoStorageResolved {
                checksum: file.checksum.to_owned(),
                reason: format!(
                    "property <{}> value {:?} is not mapped",
                    self.options.pointer, value
                ),
            })?;
        Ok(BTreeSet::from([resolve(file, locations, storage, None)?]))
    }
}
