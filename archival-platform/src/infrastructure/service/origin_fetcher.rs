use std::time::Duration;

use anyhow::{anyhow, bail};
use url::Url;

/// Downloads the bytes a storage request points to.
pub struct OriginFetcher {
    http_client: reqwest::Client,
}

impl OriginFetcher {
    pub fn new(timeout_secs: u64) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { http_client })
    }

    pub async fn fetch(&self, origin_url: &str) -> anyhow::Result<Vec<u8>> {
        let url = Url::parse(origin_url)?;
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| anyhow!("Invalid file url: {origin_url}"))?;
                Ok(tokio::fs::read(&path).await.map_err(|e| {
                    anyhow!("Cannot read {}: {e}", path.display())
                })?)
            }
            "http" | "https" => {
                let response = self.http_client.get(url).send().await?.error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
            scheme => bail!("Unsupported origin scheme <{scheme}> of {origin_url}."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.fits");
        std::fs::write(&path, b"bytes").unwrap();
        let url = Url::from_file_path(&path).unwrap();

        let fetcher = OriginFetcher::new(5).unwrap();
        assert_eq!(fetcher.fetch(url.as_str()).await.unwrap(), b"bytes");
        assert!(fetcher
            .fetch(Url::from_file_path(dir.path().join("missing")).unwrap().as_str())
            .await
            .is_err());
        assert!(fetcher.fetch("ftp://host/a.fits").await.is_err());
    }
}
