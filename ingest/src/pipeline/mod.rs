pub mod events;
pub mod summary;

use crate::models::{WorkItem, WorkPlan};
use crate::source::FileSource;
use crate::staging::StagingArea;
use crate::storage::ObjectStorage;
use common::{Error, Result};
use events::{FailureStage, IngestEvent, IngestObserver, TracingObserver};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use summary::{Delivery, ItemOutcome, LocalStatus, RemoteStatus, RunSummary};
use tracing::warn;

type StepResult<T> = std::result::Result<T, (FailureStage, Error)>;

fn at(stage: FailureStage) -> impl FnOnce(Error) -> (FailureStage, Error) {
    move |error| (stage, error)
}

/// Sequential download → decompress → upload loop over a `WorkPlan`.
///
/// Every step is idempotent: a staged `.csv` skips the download and an
/// existing object skips the upload. Failures are isolated to their item.
pub struct IngestPipeline {
    source: Arc<dyn FileSource>,
    staging: StagingArea,
    storage: Arc<dyn ObjectStorage>,
    observer: Arc<dyn IngestObserver>,
    remove_after_upload: bool,
}

impl IngestPipeline {
    pub fn new(
        source: Arc<dyn FileSource>,
        staging: StagingArea,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            source,
            staging,
            storage,
            observer: Arc::new(TracingObserver),
            remove_after_upload: false,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn IngestObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Delete the local `.csv` once its object is in the bucket.
    pub fn remove_after_upload(mut self, enabled: bool) -> Self {
        self.remove_after_upload = enabled;
        self
    }

    /// Runs the whole plan. Fails only when the bucket is unavailable or the
    /// staging directory cannot be created; item failures are counted in the
    /// returned summary.
    pub async fn run(&self, plan: &WorkPlan) -> Result<RunSummary> {
        self.ensure_bucket().await?;
        self.staging.ensure().await?;

        let total = plan.len();
        self.emit(IngestEvent::RunStarted {
            total,
            categories: plan.categories().to_vec(),
            years: plan.years().to_vec(),
            first_month: *plan.months().start(),
            last_month: *plan.months().end(),
            staging_dir: self.staging.dir().display().to_string(),
        });

        let summary = stream::iter(plan.items().enumerate())
            .fold(RunSummary::new(total), |summary, (index, item)| async move {
                let outcome = self.process(index + 1, total, item).await;
                summary.record(&outcome)
            })
            .await;

        self.emit(IngestEvent::RunFinished {
            summary: summary.clone(),
            bucket_uri: self.storage.bucket_uri(),
        });

        Ok(summary)
    }

    async fn ensure_bucket(&self) -> Result<()> {
        let bucket_uri = self.storage.bucket_uri();
        let error = match self.storage.bucket_exists().await {
            Ok(true) => {
                self.emit(IngestEvent::BucketVerified { bucket_uri });
                return Ok(());
            }
            Ok(false) => "bucket not found".to_string(),
            Err(e) => e.to_string(),
        };

        self.emit(IngestEvent::BucketUnavailable {
            bucket_uri: bucket_uri.clone(),
            error,
            hint: self.storage.creation_hint(),
        });
        Err(Error::BucketUnavailable(bucket_uri))
    }

    /// Resolves one item completely before returning.
    pub async fn process(&self, index: usize, total: usize, item: WorkItem) -> ItemOutcome {
        self.emit(IngestEvent::ItemStarted {
            index,
            total,
            item: item.clone(),
        });

        let result = match self.deliver(&item).await {
            Ok(delivery) => {
                self.emit(IngestEvent::ItemCompleted {
                    item: item.clone(),
                    uri: delivery.uri.clone(),
                });
                Ok(delivery)
            }
            Err((stage, error)) => {
                self.emit(IngestEvent::ItemFailed {
                    item: item.clone(),
                    stage,
                    error: error.to_string(),
                });
                Err(stage)
            }
        };

        ItemOutcome { item, result }
    }

    async fn deliver(&self, item: &WorkItem) -> StepResult<Delivery> {
        let local = self.stage(item).await?;
        let (remote, uri) = self.publish(item).await.map_err(at(FailureStage::Upload))?;

        if self.remove_after_upload {
            match self.staging.remove_csv(item).await {
                Ok(()) => self.emit(IngestEvent::LocalRemoved {
                    item: item.clone(),
                    path: self.staging.csv_path(item).display().to_string(),
                }),
                Err(e) => warn!(item = %item, error = %e, "Could not remove local file"),
            }
        }

        Ok(Delivery { local, remote, uri })
    }

    async fn stage(&self, item: &WorkItem) -> StepResult<LocalStatus> {
        if self.staging.is_staged(item).await {
            self.emit(IngestEvent::DownloadSkipped {
                item: item.clone(),
                path: self.staging.csv_path(item).display().to_string(),
            });
            return Ok(LocalStatus::AlreadyStaged);
        }

        let url = self.source.locate(item).map_err(at(FailureStage::Download))?;
        let gz_path = self.staging.gz_path(item);
        let downloaded = match self.source.fetch(item, &gz_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.staging.discard_download(item).await;
                return Err((FailureStage::Download, e));
            }
        };
        self.emit(IngestEvent::Downloaded {
            item: item.clone(),
            url,
            bytes: downloaded,
        });

        let decompressed = self
            .staging
            .decompress(item)
            .await
            .map_err(at(FailureStage::Decompress))?;
        self.emit(IngestEvent::Decompressed {
            item: item.clone(),
            path: self.staging.csv_path(item).display().to_string(),
            bytes: decompressed,
        });

        Ok(LocalStatus::Downloaded)
    }

    async fn publish(&self, item: &WorkItem) -> Result<(RemoteStatus, String)> {
        let key = item.object_name();
        let uri = self.storage.object_uri(&key);

        if self.storage.check_file_exists(&key).await? {
            self.emit(IngestEvent::UploadSkipped {
                item: item.clone(),
                uri: uri.clone(),
            });
            return Ok((RemoteStatus::AlreadyPresent, uri));
        }

        let bytes = self
            .storage
            .upload_file(&key, &self.staging.csv_path(item))
            .await?;
        self.emit(IngestEvent::Uploaded {
            item: item.clone(),
            uri: uri.clone(),
            bytes,
        });

        Ok((RemoteStatus::Uploaded, uri))
    }

    fn emit(&self, event: IngestEvent) {
        self.observer.on_event(&event);
    }
}
