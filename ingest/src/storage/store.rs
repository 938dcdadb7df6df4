use async_trait::async_trait;
use common::Result;
use futures::StreamExt;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, WriteMultipart};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::warn;

use crate::storage::ObjectStorage;

const READ_CHUNK: usize = 8 * 1024 * 1024;
const MAX_IN_FLIGHT_PARTS: usize = 4;

/// `object_store` backed bucket (Google Cloud Storage, or in-memory).
pub struct ObjectStoreStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    scheme: &'static str,
    hint: String,
}

impl ObjectStoreStorage {
    /// Credentials come from `service_account_path` when given, otherwise
    /// from the usual `GOOGLE_*` environment variables.
    pub fn gcs(bucket: &str, project_id: &str, service_account_path: Option<&str>) -> Result<Self> {
        let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(bucket);
        if let Some(path) = service_account_path {
            builder = builder.with_service_account_path(path);
        }

        Ok(Self {
            store: Arc::new(builder.build()?),
            bucket: bucket.to_string(),
            scheme: "gs",
            hint: gcs_creation_hint(project_id, bucket),
        })
    }
}

#[cfg(test)]
impl ObjectStoreStorage {
    pub fn in_memory(bucket: &str) -> Self {
        Self {
            store: Arc::new(object_store::memory::InMemory::new()),
            bucket: bucket.to_string(),
            scheme: "memory",
            hint: format!("create bucket '{}' in the backing store", bucket),
        }
    }

    pub fn store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.store)
    }
}

#[async_trait]
impl ObjectStorage for ObjectStoreStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_uri(&self, key: &str) -> String {
        format!("{}://{}/{}", self.scheme, self.bucket, key)
    }

    fn creation_hint(&self) -> String {
        self.hint.clone()
    }

    /// Reads at most the first listing page, so a large bucket costs one request.
    async fn bucket_exists(&self) -> Result<bool> {
        match self.store.list(None).next().await {
            None | Some(Ok(_)) => Ok(true),
            Some(Err(object_store::Error::NotFound { .. })) => Ok(false),
            Some(Err(e)) => Err(e.into()),
        }
    }

    async fn check_file_exists(&self, key: &str) -> Result<bool> {
        match self.store.head(&ObjectPath::from(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn upload_file(&self, key: &str, path: &Path) -> Result<u64> {
        let upload = self.store.put_multipart(&ObjectPath::from(key)).await?;
        let mut writer = WriteMultipart::new(upload);

        match copy_file(&mut writer, path).await {
            Ok(bytes) => {
                writer.finish().await?;
                Ok(bytes)
            }
            Err(e) => {
                if let Err(abort_err) = writer.abort().await {
                    warn!(key, error = %abort_err, "Failed to abort multipart upload");
                }
                Err(e)
            }
        }
    }
}

fn gcs_creation_hint(project_id: &str, bucket: &str) -> String {
    format!("gsutil mb -p {} -l US gs://{}", project_id, bucket)
}

async fn copy_file(writer: &mut WriteMultipart, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; READ_CHUNK];
    let mut total: u64 = 0;

    loop {
        writer.wait_for_capacity(MAX_IN_FLIGHT_PARTS).await?;
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write(&buf[..n]);
        total += n as u64;
    }

    Ok(total)
}
