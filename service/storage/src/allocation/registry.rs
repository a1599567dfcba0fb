use std::{collections::HashMap, sync::Arc};

use domain_storage::{
    exception::{FileRequestException, FileRequestResult},
    service::AllocationStrategy,
};

use super::{
    metadata::MetadataOptions, parse_options, replicate::ReplicateOptions,
    DefaultAllocationStrategy, MetadataAllocationStrategy, PropertyMappingAllocationStrategy,
    ProtocolAllocationStrategy, ReplicateAllocationStrategy,
};

/// Builds a strategy from its configuration options.
pub type StrategyConstructor =
    fn(&serde_json::Value) -> anyhow::Result<Arc<dyn AllocationStrategy>>;

/// Maps strategy identifiers to their constructors.
pub struct AllocationStrategyRegistry {
    constructors: HashMap<String, StrategyConstructor>,
}

impl Default for AllocationStrategyRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl AllocationStrategyRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(DefaultAllocationStrategy::ID, |_| {
            Ok(Arc::new(DefaultAllocationStrategy))
        });
        registry.register(MetadataAllocationStrategy::ID, |options| {
            let options: MetadataOptions = if options.is_null() {
                parse_options(MetadataAllocationStrategy::ID, &serde_json::json!({}))?
            } else {
                parse_options(MetadataAllocationStrategy::ID, options)?
            };
            Ok(Arc::new(MetadataAllocationStrategy::from_options(options)))
        });
        registry.register(ReplicateAllocationStrategy::ID, |options| {
            let options: ReplicateOptions = parse_options(ReplicateAllocationStrategy::ID, options)?;
            Ok(Arc::new(ReplicateAllocationStrategy::from_options(options)))
        });
        registry.register(PropertyMappingAllocationStrategy::ID, |options| {
            Ok(Arc::new(PropertyMappingAllocationStrategy::new(parse_options(
                PropertyMappingAllocationStrategy::ID,
                options,
            )?)))
        });
        registry.register(ProtocolAllocationStrategy::ID, |options| {
            Ok(Arc::new(ProtocolAllocationStrategy::new(parse_options(
                ProtocolAllocationStrategy::ID,
                options,
            )?)))
        });
        registry
    }

    /// Register a constructor, replacing any other under the same id.
    pub fn register(&mut self, id: &str, constructor: StrategyConstructor) {
        self.constructors.insert(id.to_owned(), constructor);
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.constructors.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn build(
        &self,
        id: &str,
        options: &serde_json::Value,
    ) -> FileRequestResult<Arc<dyn AllocationStrategy>> {
        let constructor = self
            .constructors
            .get(id)
            .ok_or_else(|| FileRequestException::UnknownStrategy { id: id.to_owned() })?;
        Ok(constructor(options)?)
    }
}
