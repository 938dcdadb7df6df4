use crate::models::WorkItem;
use crate::pipeline::summary::RunSummary;
use std::fmt;
use tracing::{debug, error, info, warn};

/// The step at which a work item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Download,
    Decompress,
    Upload,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            FailureStage::Download => "download",
            FailureStage::Decompress => "decompress",
            FailureStage::Upload => "upload",
        };
        f.write_str(stage)
    }
}

/// Progress reported by the ingestion loop.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestEvent {
    RunStarted {
        total: usize,
        categories: Vec<String>,
        years: Vec<i32>,
        first_month: u32,
        last_month: u32,
        staging_dir: String,
    },
    BucketVerified {
        bucket_uri: String,
    },
    BucketUnavailable {
        bucket_uri: String,
        error: String,
        hint: String,
    },
    ItemStarted {
        index: usize,
        total: usize,
        item: WorkItem,
    },
    DownloadSkipped {
        item: WorkItem,
        path: String,
    },
    Downloaded {
        item: WorkItem,
        url: String,
        bytes: u64,
    },
    Decompressed {
        item: WorkItem,
        path: String,
        bytes: u64,
    },
    UploadSkipped {
        item: WorkItem,
        uri: String,
    },
    Uploaded {
        item: WorkItem,
        uri: String,
        bytes: u64,
    },
    ItemCompleted {
        item: WorkItem,
        uri: String,
    },
    LocalRemoved {
        item: WorkItem,
        path: String,
    },
    ItemFailed {
        item: WorkItem,
        stage: FailureStage,
        error: String,
    },
    RunFinished {
        summary: RunSummary,
        bucket_uri: String,
    },
}

/// Receives every event of a run, in order.
pub trait IngestObserver: Send + Sync {
    fn on_event(&self, event: &IngestEvent);
}

impl<F> IngestObserver for F
where
    F: Fn(&IngestEvent) + Send + Sync,
{
    fn on_event(&self, event: &IngestEvent) {
        self(event)
    }
}

const RULE: &str = "============================================================";

/// Human-readable progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl IngestObserver for TracingObserver {
    fn on_event(&self, event: &IngestEvent) {
        match event {
            IngestEvent::RunStarted { .. } => {
                for line in start_lines(event) {
                    info!("{}", line);
                }
            }
            IngestEvent::BucketVerified { bucket_uri } => {
                info!("Bucket {} exists and is accessible", bucket_uri);
            }
            IngestEvent::BucketUnavailable {
                bucket_uri,
                error,
                hint,
            } => {
                error!(
                    error = %error,
                    "Bucket {} does not exist or is not accessible", bucket_uri
                );
                error!("Please create the bucket first using:");
                error!("  {}", hint);
            }
            IngestEvent::ItemStarted { index, total, item } => {
                info!("{}", RULE);
                info!("[{}/{}] Processing {}", index, total, item);
            }
            IngestEvent::DownloadSkipped { item, path } => {
                info!(path = %path, "File {} already exists, skipping download", item.csv_file_name());
            }
            IngestEvent::Downloaded { url, bytes, .. } => {
                info!(bytes, "Downloaded {}", url);
            }
            IngestEvent::Decompressed { item, bytes, .. } => {
                info!(bytes, "Decompressed {}", item.csv_file_name());
            }
            IngestEvent::UploadSkipped { item, uri } => {
                info!(uri = %uri, "File {} already exists in bucket, skipping upload", item.object_name());
            }
            IngestEvent::Uploaded { uri, bytes, .. } => {
                info!(bytes, "Successfully uploaded to {}", uri);
            }
            IngestEvent::ItemCompleted { item, uri } => {
                debug!(uri = %uri, "Finished {}", item);
            }
            IngestEvent::LocalRemoved { path, .. } => {
                info!("Removed local file {}", path);
            }
            IngestEvent::ItemFailed { item, stage, error } => {
                warn!(stage = %stage, error = %error, "Skipping {} due to {} failure", item, stage);
            }
            IngestEvent::RunFinished {
                summary,
                bucket_uri,
            } => {
                for line in summary_lines(summary, bucket_uri) {
                    info!("{}", line);
                }
            }
        }
    }
}

fn start_lines(event: &IngestEvent) -> Vec<String> {
    let IngestEvent::RunStarted {
        total,
        categories,
        years,
        first_month,
        last_month,
        staging_dir,
    } = event
    else {
        return Vec::new();
    };

    let years: Vec<String> = years.iter().map(|y| y.to_string()).collect();
    vec![
        format!("Starting upload of {} files...", total),
        format!("Categories: {}", categories.join(", ")),
        format!("Years: {}", years.join(", ")),
        format!("Months: {:02}-{:02}", first_month, last_month),
        format!("Staging directory: {}", staging_dir),
    ]
}

fn summary_lines(summary: &RunSummary, bucket_uri: &str) -> Vec<String> {
    let mut lines = vec![
        RULE.to_string(),
        "Upload Summary".to_string(),
        RULE.to_string(),
        format!("Total files processed: {}/{}", summary.processed, summary.total),
        format!("Successful uploads:    {}", summary.successful),
        format!("Failed uploads:        {}", summary.failed),
        format!(
            "Downloaded: {}, already staged: {}, uploaded: {}, already in bucket: {}",
            summary.downloaded, summary.already_staged, summary.uploaded, summary.already_present
        ),
        format!("All files uploaded to: {}", bucket_uri),
        RULE.to_string(),
    ];

    if summary.successful > 0 {
        lines.extend([
            "Next steps:".to_string(),
            "1. Create BigQuery external tables pointing to these CSV files".to_string(),
            "2. Use dbt to transform and model the data".to_string(),
            "3. Query the data in BigQuery".to_string(),
        ]);
    }
    lines
}
