use crate::models::WorkItem;
use common::{Error, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Flat local directory holding `.csv.gz` downloads and their `.csv` output.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates the staging directory if it is missing.
    pub async fn ensure(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn csv_path(&self, item: &WorkItem) -> PathBuf {
        self.dir.join(item.csv_file_name())
    }

    pub fn gz_path(&self, item: &WorkItem) -> PathBuf {
        self.dir.join(item.gz_file_name())
    }

    fn part_path(&self, item: &WorkItem) -> PathBuf {
        self.dir.join(format!("{}.part", item.csv_file_name()))
    }

    pub async fn is_staged(&self, item: &WorkItem) -> bool {
        tokio::fs::try_exists(self.csv_path(item))
            .await
            .unwrap_or(false)
    }

    /// Decompresses the item's `.gz` into its `.csv` and deletes the `.gz`.
    ///
    /// Output goes to a `.part` file first, so a `.csv` only ever appears
    /// complete. On failure the partial output and the `.gz` are removed.
    pub async fn decompress(&self, item: &WorkItem) -> Result<u64> {
        let gz_path = self.gz_path(item);
        let part_path = self.part_path(item);
        let csv_path = self.csv_path(item);

        let (src, dst) = (gz_path.clone(), part_path.clone());
        let outcome = async {
            let bytes = tokio::task::spawn_blocking(move || decompress_gzip(&src, &dst))
                .await
                .map_err(|e| Error::Other(format!("decompression task failed: {}", e)))??;
            tokio::fs::rename(&part_path, &csv_path).await?;
            Ok::<u64, Error>(bytes)
        }
        .await;

        match outcome {
            Ok(bytes) => {
                // Best effort: the csv is already complete.
                remove_if_exists(&gz_path).await;
                debug!(path = %csv_path.display(), bytes, "Decompressed staged file");
                Ok(bytes)
            }
            Err(e) => {
                remove_if_exists(&part_path).await;
                remove_if_exists(&gz_path).await;
                Err(e)
            }
        }
    }

    pub async fn remove_csv(&self, item: &WorkItem) -> Result<()> {
        tokio::fs::remove_file(self.csv_path(item)).await?;
        Ok(())
    }

    pub async fn discard_download(&self, item: &WorkItem) {
        remove_if_exists(&self.gz_path(item)).await;
    }
}

async fn remove_if_exists(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!(path = %path.display(), error = %e, "Could not remove staged file");
        }
    }
}

/// Streams a gzip file (possibly multi-member) into `dst`, returning the
/// number of decompressed bytes written.
pub fn decompress_gzip(src: &Path, dst: &Path) -> Result<u64> {
    let decompress_err = |source: std::io::Error| Error::Decompress {
        path: src.display().to_string(),
        source,
    };

    let input = File::open(src)?;
    let mut decoder = MultiGzDecoder::new(BufReader::new(input));
    let mut output = BufWriter::new(File::create(dst)?);

    let bytes = std::io::copy(&mut decoder, &mut output).map_err(decompress_err)?;
    output.flush()?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    const CSV: &[u8] = b"VendorID,lpep_pickup_datetime,trip_distance\n2,2019-01-01 00:10:16,1.37\n";

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[tokio::test]
    async fn test_decompress_replaces_gz_with_csv() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path());
        let item = WorkItem::new("green", 2019, 1);

        std::fs::write(staging.gz_path(&item), gzip(CSV)).unwrap();
        assert!(!staging.is_staged(&item).await);

        let bytes = staging.decompress(&item).await.unwrap();

        assert_eq!(bytes, CSV.len() as u64);
        assert!(staging.is_staged(&item).await);
        assert!(!staging.gz_path(&item).exists());
        assert!(!staging.part_path(&item).exists());
        assert_eq!(std::fs::read(staging.csv_path(&item)).unwrap(), CSV);
    }

    #[tokio::test]
    async fn test_decompress_multi_member() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path());
        let item = WorkItem::new("fhv", 2019, 2);

        let mut data = gzip(b"a,b\n");
        data.extend(gzip(b"1,2\n"));
        std::fs::write(staging.gz_path(&item), data).unwrap();

        staging.decompress(&item).await.unwrap();
        assert_eq!(std::fs::read(staging.csv_path(&item)).unwrap(), b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_corrupt_gz_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path());
        let item = WorkItem::new("yellow", 2020, 5);

        std::fs::write(staging.gz_path(&item), b"definitely not gzip").unwrap();

        let err = staging.decompress(&item).await.unwrap_err();
        assert!(matches!(err, Error::Decompress { .. }));
        assert!(!staging.gz_path(&item).exists());
        assert!(!staging.part_path(&item).exists());
        assert!(!staging.csv_path(&item).exists());
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path());
        let item = WorkItem::new("green", 2020, 8);

        // A directory in the csv's place makes the final rename fail.
        std::fs::create_dir(staging.csv_path(&item)).unwrap();
        std::fs::write(staging.gz_path(&item), gzip(CSV)).unwrap();

        let err = staging.decompress(&item).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(!staging.gz_path(&item).exists());
        assert!(!staging.part_path(&item).exists());
    }

    #[tokio::test]
    async fn test_ensure_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path().join("nested").join("data"));
        staging.ensure().await.unwrap();
        assert!(staging.dir().is_dir());
    }
}
