use std::path::Path;

use chrono::Duration;
use domain_storage::{command::CACHE_STORAGE, model::entity::StorageLocation};
use serde::Deserialize;

use super::telemetry::TelemetryConfig;

#[derive(Clone, Deserialize, Debug)]
pub struct PlatformConfig {
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub storages: Vec<StorageLocationConfig>,
    #[serde(default)]
    pub allocation: AllocationConfig,
    #[serde(default)]
    pub requests: RequestConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub internal_topics: InternalTopics,
    /// Timeout of origin downloads.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            telemetry: Default::default(),
            storages: Default::default(),
            allocation: Default::default(),
            requests: Default::default(),
            cache: Default::default(),
            internal_topics: Default::default(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_http_timeout_secs() -> u64 {
    60
}

fn default_enabled() -> bool {
    true
}

/// One storage location and the backend holding its files.
#[derive(Clone, Deserialize, Debug)]
pub struct StorageLocationConfig {
    pub id: String,
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub online: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub backend: StorageBackendConfig,
}

impl StorageLocationConfig {
    pub fn location(&self) -> StorageLocation {
        let mut location = StorageLocation::new(&self.id, self.priority, self.online);
        location.enabled = self.enabled;
        location
    }
}

#[derive(Default, Clone, Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageBackendConfig {
    /// Lost on restart.
    #[default]
    Memory,
    Fs {
        root: String,
    },
    S3(S3Options),
}

#[derive(Clone, Deserialize, Debug)]
pub struct S3Options {
    pub endpoint: String,
    pub bucket: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AllocationConfig {
    /// Identifier of a registered allocation strategy.
    #[serde(default = "AllocationConfig::default_strategy")]
    pub strategy: String,
    #[serde(default)]
    pub options: serde_json::Value,
}

impl AllocationConfig {
    fn default_strategy() -> String {
        "default".to_string()
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            strategy: Self::default_strategy(),
            options: Default::default(),
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct RequestConfig {
    #[serde(default = "RequestConfig::default_dispatch_interval_secs")]
    pub dispatch_interval_secs: u64,
    #[serde(default = "RequestConfig::default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "RequestConfig::default_running_staleness_secs")]
    pub running_staleness_secs: i64,
    /// 0 never expires groups.
    #[serde(default = "RequestConfig::default_group_expiration_days")]
    pub group_expiration_days: i64,
    #[serde(default = "RequestConfig::default_max_jobs_per_pass")]
    pub max_jobs_per_pass: usize,
}

impl RequestConfig {
    fn default_dispatch_interval_secs() -> u64 {
        2
    }
    fn default_sweep_interval_secs() -> u64 {
        30
    }
    fn default_running_staleness_secs() -> i64 {
        3600
    }
    fn default_group_expiration_days() -> i64 {
        2
    }
    fn default_max_jobs_per_pass() -> usize {
        100
    }

    pub fn running_staleness(&self) -> Duration {
        Duration::seconds(self.running_staleness_secs)
    }

    pub fn group_expiration(&self) -> Option<Duration> {
        (self.group_expiration_days > 0).then(|| Duration::days(self.group_expiration_days))
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            dispatch_interval_secs: Self::default_dispatch_interval_secs(),
            sweep_interval_secs: Self::default_sweep_interval_secs(),
            running_staleness_secs: Self::default_running_staleness_secs(),
            group_expiration_days: Self::default_group_expiration_days(),
            max_jobs_per_pass: Self::default_max_jobs_per_pass(),
        }
    }
}

/// Where availability requests restore files, it is not a storage location.
#[derive(Clone, Deserialize, Debug)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: StorageBackendConfig,
    #[serde(default = "CacheConfig::default_expiration_hours")]
    pub expiration_hours: i64,
}

impl CacheConfig {
    fn default_expiration_hours() -> i64 {
        24
    }

    pub fn expiration(&self) -> Duration {
        Duration::hours(self.expiration_hours.max(0))
    }

    /// The backend settings of the cache, under the cache storage id.
    pub fn backend_config(&self) -> StorageLocationConfig {
        StorageLocationConfig {
            id: CACHE_STORAGE.to_owned(),
            priority: 0,
            online: true,
            enabled: true,
            backend: self.backend.clone(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: Default::default(),
            expiration_hours: Self::default_expiration_hours(),
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct InternalTopics {
    /// Inbound batches of file operations.
    #[serde(default = "InternalTopics::default_file_requests")]
    pub file_requests: String,
    /// Inbound submission packages.
    #[serde(default = "InternalTopics::default_sip_submissions")]
    pub sip_submissions: String,
    #[serde(default = "InternalTopics::default_storage_jobs")]
    pub storage_jobs: String,
    #[serde(default = "InternalTopics::default_worker_reports")]
    pub worker_reports: String,
    #[serde(default = "InternalTopics::default_group_results")]
    pub group_results: String,
    #[serde(default = "InternalTopics::default_package_changes")]
    pub package_changes: String,
}

impl InternalTopics {
    fn default_file_requests() -> String {
        "file-requests".to_string()
    }
    fn default_sip_submissions() -> String {
        "sip-submissions".to_string()
    }
    fn default_storage_jobs() -> String {
        "storage-jobs".to_string()
    }
    fn default_worker_reports() -> String {
        "worker-reports".to_string()
    }
    fn default_group_results() -> String {
        "group-results".to_string()
    }
    fn default_package_changes() -> String {
        "aip-changes".to_string()
    }
}

impl Default for InternalTopics {
    fn default() -> Self {
        Self {
            file_requests: Self::default_file_requests(),
            sip_submissions: Self::default_sip_submissions(),
            storage_jobs: Self::default_storage_jobs(),
            worker_reports: Self::default_worker_reports(),
            group_results: Self::default_group_results(),
            package_changes: Self::default_package_changes(),
        }
    }
}

/// Layered configuration: `config.yaml` (or the file named by `ARCHIVAL_CONFIG`),
/// yaml files given as arguments, then `ARCHIVAL__*` environment variables.
pub fn build_config() -> anyhow::Result<config::Config> {
    let file = std::env::var("ARCHIVAL_CONFIG").unwrap_or_else(|_| "config".to_string());
    let mut config = config::Config::builder().add_source(
        config::File::with_name(&file)
            .required(false)
            .format(config::FileFormat::Yaml),
    );
    for arg in std::env::args().skip(1) {
        if arg.ends_with("yaml") || arg.ends_with("yml") {
            config = config.add_source(
                config::File::from(Path::new(arg.as_str()))
                    .format(config::FileFormat::Yaml)
                    .required(false),
            );
        }
    }
    config = config.add_source(
        config::Environment::with_prefix("ARCHIVAL")
            .separator("__")
            .try_parsing(true),
    );
    Ok(config.build()?)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn test_defaults_apply_to_missing_fields() {
        let yaml = indoc! {r#"
            storages:
              - id: S1
                online: true
              - id: tape
                priority: 2
                enabled: false
                backend:
                  type: fs
                  root: /srv/tape
            requests:
              group_expiration_days: 0
            cache:
              backend:
                type: fs
                root: /srv/cache
        "#};
        let config: PlatformConfig = config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.storages.len(), 2);
        assert!(matches!(config.storages[0].backend, StorageBackendConfig::Memory));
        assert!(config.storages[0].location().enabled);
        assert!(!config.storages[1].location().enabled);
        assert!(matches!(
            &config.storages[1].backend,
            StorageBackendConfig::Fs { root } if root == "/srv/tape"
        ));
        assert_eq!(config.requests.group_expiration(), None);
        assert_eq!(config.requests.dispatch_interval_secs, 2);
        assert_eq!(config.requests.running_staleness(), Duration::hours(1));
        assert_eq!(config.allocation.strategy, "default");
        assert_eq!(config.internal_topics.group_results, "group-results");
        assert_eq!(config.http_timeout_secs, 60);
        assert_eq!(config.cache.expiration(), Duration::hours(24));
        assert_eq!(config.cache.backend_config().id, "cache");
        assert!(matches!(
            &config.cache.backend,
            StorageBackendConfig::Fs { root } if root == "/srv/cache"
        ));
    }
}
