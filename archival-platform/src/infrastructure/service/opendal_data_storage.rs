use anyhow::anyhow;
use async_trait::async_trait;
use domain_storage::service::DataStorageService;
use opendal::{
    services::{Fs, Memory, S3},
    Operator,
};

use crate::infrastructure::config::{S3Options, StorageBackendConfig, StorageLocationConfig};

/// A storage location backed by an OpenDAL operator.
///
/// Files are reachable at `<storage id in lowercase>://<path>`.
pub struct OpendalDataStorage {
    storage: String,
    scheme: String,
    operator: Operator,
}

impl OpendalDataStorage {
    pub fn new(storage: &str, operator: Operator) -> Self {
        Self {
            storage: storage.to_owned(),
            scheme: storage.to_lowercase(),
            operator,
        }
    }

    pub fn from_config(config: &StorageLocationConfig) -> anyhow::Result<Self> {
        let operator = match &config.backend {
            StorageBackendConfig::Memory => Operator::new(Memory::default())?.finish(),
            StorageBackendConfig::Fs { root } => {
                let mut builder = Fs::default();
                builder.root(root);
                Operator::new(builder)?.finish()
            }
            StorageBackendConfig::S3(options) => create_s3_operator(&config.id, options)?,
        };
        Ok(Self::new(&config.id, operator))
    }

    fn path_of<'a>(&self, url: &'a str) -> anyhow::Result<&'a str> {
        url.strip_prefix(&self.scheme)
            .and_then(|rest| rest.strip_prefix("://"))
            .filter(|path| !path.is_empty())
            .ok_or_else(|| anyhow!("Url {url} is not on storage {}.", self.storage))
    }
}

#[async_trait]
impl DataStorageService for OpendalDataStorage {
    fn storage(&self) -> &str {
        &self.storage
    }

    async fn store(&self, path: &str, content: Vec<u8>) -> anyhow::Result<String> {
        let path = path.trim_start_matches('/');
        self.operator.write(path, content).await?;
        Ok(format!("{}://{path}", self.scheme))
    }

    async fn retrieve(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        Ok(self.operator.read(self.path_of(url)?).await?)
    }

    async fn delete(&self, url: &str) -> anyhow::Result<()> {
        Ok(self.operator.delete(self.path_of(url)?).await?)
    }
}

fn create_s3_operator(storage: &str, options: &S3Options) -> anyhow::Result<Operator> {
    let root = if options.root.is_empty() {
        format!("storage-{}", storage.to_lowercase())
    } else {
        options.root.to_owned()
    };
    let mut builder = S3::default();
    builder
        .endpoint(&options.endpoint)
        .root(&root)
        .bucket(&options.bucket)
        .region(&options.region)
        .access_key_id(&options.access_key_id)
        .secret_access_key(&options.secret_access_key);
    Ok(Operator::new(builder)?.finish())
}
