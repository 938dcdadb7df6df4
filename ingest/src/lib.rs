pub mod models;
pub mod pipeline;
pub mod source;
pub mod staging;
pub mod storage;

use common::Result;
use common::config::Settings;
use models::{WorkItem, WorkPlan};
use pipeline::IngestPipeline;
use pipeline::summary::RunSummary;
use source::{FileSource, HttpSource};
use staging::StagingArea;
use std::sync::Arc;

/// Runs the download → decompress → upload loop described by a config file.
pub async fn run_ingest_pipeline(config_path: &str) -> Result<RunSummary> {
    let settings = Settings::new(config_path)?;
    run_with_settings(&settings).await
}

pub async fn run_with_settings(settings: &Settings) -> Result<RunSummary> {
    let plan = WorkPlan::from_config(&settings.dataset)?;
    let source = Arc::new(HttpSource::new(&settings.source)?);
    let storage = storage::build_storage(settings).await?;

    let pipeline = IngestPipeline::new(
        source,
        StagingArea::new(settings.staging.dir.clone()),
        storage,
    )
    .remove_after_upload(settings.staging.remove_after_upload);

    pipeline.run(&plan).await
}

/// One row of `ingest-cli plan` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub item: WorkItem,
    pub url: String,
    pub object_name: String,
}

/// Lists what a run would fetch and upload, without touching the network.
pub fn plan_files(settings: &Settings) -> Result<Vec<PlannedFile>> {
    let plan = WorkPlan::from_config(&settings.dataset)?;
    let source = HttpSource::new(&settings.source)?;

    plan.items()
        .map(|item| -> Result<PlannedFile> {
            Ok(PlannedFile {
                url: source.locate(&item)?,
                object_name: item.object_name(),
                item,
            })
        })
        .collect()
}
