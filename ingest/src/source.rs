use crate::models::WorkItem;
use async_trait::async_trait;
use common::config::SourceConfig;
use common::{Error, Result};
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

/// Where compressed monthly files come from.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Address of the item's `.csv.gz`.
    fn locate(&self, item: &WorkItem) -> Result<String>;

    /// Streams the item's `.csv.gz` into `dest`, returning the bytes written.
    async fn fetch(&self, item: &WorkItem, dest: &Path) -> Result<u64>;
}

/// GitHub-release style HTTP source:
/// `{base_url}/{category}/{category}_tripdata_{year}-{month:02}.csv.gz`.
pub struct HttpSource {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        // Trailing slash keeps the last path segment when joining.
        let base = format!("{}/", config.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&base)?;

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("tlc-ingest/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            base_url,
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl FileSource for HttpSource {
    fn locate(&self, item: &WorkItem) -> Result<String> {
        let url = self
            .base_url
            .join(&format!("{}/{}", item.category, item.gz_file_name()))?;
        Ok(url.to_string())
    }

    async fn fetch(&self, item: &WorkItem, dest: &Path) -> Result<u64> {
        let url = self.locate(item)?;
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Error::HttpStatus {
                url,
                status: response.status().as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(url = %url, bytes = written, "Download complete");
        Ok(written)
    }
}
