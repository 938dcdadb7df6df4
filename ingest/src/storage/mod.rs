pub mod s3;
pub mod store;

use async_trait::async_trait;
use common::Result;
use common::config::{Settings, StorageBackend};
use std::path::Path;
use std::sync::Arc;

use s3::{S3Config, S3Storage};
use store::ObjectStoreStorage;

/// A single bucket with a flat namespace. Objects are never overwritten by
/// the ingestion loop, so only existence checks and uploads are needed.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    fn bucket(&self) -> &str;

    /// Full address of an object, e.g. `gs://bucket/key`.
    fn object_uri(&self, key: &str) -> String;

    /// Address of the bucket root, e.g. `gs://bucket/`.
    fn bucket_uri(&self) -> String {
        self.object_uri("")
    }

    /// Out-of-band command that creates the bucket.
    fn creation_hint(&self) -> String;

    async fn bucket_exists(&self) -> Result<bool>;

    async fn check_file_exists(&self, key: &str) -> Result<bool>;

    /// Uploads the file at `path` under `key`, returning the bytes sent.
    async fn upload_file(&self, key: &str, path: &Path) -> Result<u64>;
}

/// Builds the configured backend for the target bucket.
pub async fn build_storage(settings: &Settings) -> Result<Arc<dyn ObjectStorage>> {
    let storage = &settings.storage;
    let backend: Arc<dyn ObjectStorage> = match storage.backend {
        StorageBackend::Gcs => Arc::new(ObjectStoreStorage::gcs(
            &storage.bucket,
            &settings.project_id,
            storage.service_account_path.as_deref(),
        )?),
        StorageBackend::S3 => {
            let config = S3Config {
                endpoint: storage.endpoint.clone(),
                region: storage.region.clone(),
                access_key: storage.access_key.clone(),
                secret_key: storage.secret_key.clone(),
            };
            Arc::new(S3Storage::connect(&config, &storage.bucket).await)
        }
    };
    Ok(backend)
}
