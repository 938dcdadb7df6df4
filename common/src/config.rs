use config::{Config, ConfigError, FileFormat};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_project_id")]
    pub project_id: String,
    pub dataset: DatasetConfig,
    #[serde(default = "default_source_config")]
    pub source: SourceConfig,
    #[serde(default = "default_staging_config")]
    pub staging: StagingConfig,
    #[serde(default = "default_storage_config")]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    pub categories: Vec<String>,
    pub years: Vec<i32>,
    #[serde(default = "default_first_month")]
    pub first_month: u32,
    #[serde(default = "default_last_month")]
    pub last_month: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Whole-request timeout. Unset means a stalled download blocks the run.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StagingConfig {
    #[serde(default = "default_staging_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub remove_after_upload: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Gcs,
    S3,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    // gcs
    #[serde(default)]
    pub service_account_path: Option<String>,
    // s3 / minio
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_s3_region")]
    pub region: String,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
}

fn default_project_id() -> String {
    "dtc-de-course-486009".to_string()
}

fn default_first_month() -> u32 {
    1
}

fn default_last_month() -> u32 {
    12
}

fn default_base_url() -> String {
    "https://github.com/DataTalksClub/nyc-tlc-data/releases/download".to_string()
}

fn default_source_config() -> SourceConfig {
    SourceConfig {
        base_url: default_base_url(),
        timeout_secs: None,
    }
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_staging_config() -> StagingConfig {
    StagingConfig {
        dir: default_staging_dir(),
        remove_after_upload: false,
    }
}

fn default_backend() -> StorageBackend {
    StorageBackend::Gcs
}

fn default_bucket() -> String {
    "dtc-decourse-dbt-nytaxi".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

fn default_storage_config() -> StorageConfig {
    StorageConfig {
        backend: default_backend(),
        bucket: default_bucket(),
        service_account_path: None,
        endpoint: None,
        region: default_s3_region(),
        access_key: None,
        secret_key: None,
    }
}

impl Settings {
    /// Loads settings from a config file, overlaid with `APP_`-prefixed
    /// environment variables (`APP_STORAGE__BUCKET=...`).
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        Self::finish(builder.build()?)
    }

    /// Loads settings from an in-memory TOML document, without the
    /// environment overlay.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(config::File::from_str(contents, FileFormat::Toml))
            .build()?;

        Self::finish(config)
    }

    fn finish(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;

        debug!(
            dataset = ?settings.dataset,
            backend = ?settings.storage.backend,
            bucket = %settings.storage.bucket,
            "Parsed ingestion settings"
        );

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let dataset = &self.dataset;
        if dataset.categories.is_empty() {
            return Err(ConfigError::Message(
                "dataset.categories must name at least one category".into(),
            ));
        }
        if let Some(bad) = dataset
            .categories
            .iter()
            .find(|c| c.trim().is_empty() || c.contains('/'))
        {
            return Err(ConfigError::Message(format!(
                "invalid dataset category '{}'",
                bad
            )));
        }
        if dataset.years.is_empty() {
            return Err(ConfigError::Message(
                "dataset.years must list at least one year".into(),
            ));
        }
        if !(1..=12).contains(&dataset.first_month)
            || !(1..=12).contains(&dataset.last_month)
            || dataset.first_month > dataset.last_month
        {
            return Err(ConfigError::Message(format!(
                "invalid month range {}..={}",
                dataset.first_month, dataset.last_month
            )));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::Message("storage.bucket must be set".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_taxi_upload() {
        let settings = Settings::from_toml_str(
            r#"
            [dataset]
            categories = ["green", "yellow"]
            years = [2019, 2020]
            "#,
        )
        .unwrap();

        assert_eq!(settings.project_id, "dtc-de-course-486009");
        assert_eq!(settings.dataset.first_month, 1);
        assert_eq!(settings.dataset.last_month, 12);
        assert_eq!(settings.staging.dir, PathBuf::from("data"));
        assert!(!settings.staging.remove_after_upload);
        assert_eq!(settings.storage.backend, StorageBackend::Gcs);
        assert_eq!(settings.storage.bucket, "dtc-decourse-dbt-nytaxi");
        assert_eq!(
            settings.source.base_url,
            "https://github.com/DataTalksClub/nyc-tlc-data/releases/download"
        );
        assert_eq!(settings.source.timeout_secs, None);
    }

    #[test]
    fn test_s3_backend() {
        let settings = Settings::from_toml_str(
            r#"
            [dataset]
            categories = ["fhv"]
            years = [2019]

            [storage]
            backend = "s3"
            bucket = "trips"
            endpoint = "http://localhost:9000"
            access_key = "minioadmin"
            secret_key = "minioadmin"
            "#,
        )
        .unwrap();

        assert_eq!(settings.storage.backend, StorageBackend::S3);
        assert_eq!(settings.storage.bucket, "trips");
        assert_eq!(settings.storage.region, "us-east-1");
        assert_eq!(
            settings.storage.endpoint.as_deref(),
            Some("http://localhost:9000")
        );
    }

    #[test]
    fn test_rejects_bad_month_range() {
        let result = Settings::from_toml_str(
            r#"
            [dataset]
            categories = ["green"]
            years = [2019]
            first_month = 6
            last_month = 13
            "#,
        );
        assert!(result.is_err());

        let result = Settings::from_toml_str(
            r#"
            [dataset]
            categories = ["green"]
            years = [2019]
            first_month = 7
            last_month = 6
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_empty_dataset() {
        let no_categories = Settings::from_toml_str(
            r#"
            [dataset]
            categories = []
            years = [2019]
            "#,
        );
        assert!(no_categories.is_err());

        let no_years = Settings::from_toml_str(
            r#"
            [dataset]
            categories = ["green"]
            years = []
            "#,
        );
        assert!(no_years.is_err());

        let slash = Settings::from_toml_str(
            r#"
            [dataset]
            categories = ["green/../x"]
            years = [2019]
            "#,
        );
        assert!(slash.is_err());
    }
}
