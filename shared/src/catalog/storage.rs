//! Object storage layout and uploads for ingested CSV files.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::info;

use super::identifiers::{sanitize_identifier, ColumnPair};
use crate::{Error, Result};

/// Where a CSV lands in the bucket and where its table points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLayout {
    /// Object key of the uploaded file
    pub key: String,
    /// `s3://` folder registered as the table location
    pub location: String,
}

impl ObjectLayout {
    /// Deterministic layout: `<prefix>/<table>/<sanitized stem>.csv`.
    pub fn for_file(bucket: &str, prefix: &str, table: &str, csv_path: &Path) -> Self {
        let stem = csv_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = format!("{}.csv", sanitize_identifier(&stem));

        let folders: Vec<&str> = [prefix.trim_matches('/'), table]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect();

        if folders.is_empty() {
            Self {
                key: file_name,
                location: format!("s3://{}/", bucket),
            }
        } else {
            let folder = folders.join("/");
            Self {
                key: format!("{}/{}", folder, file_name),
                location: format!("s3://{}/{}/", bucket, folder),
            }
        }
    }
}

/// Destination for uploaded files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, bucket: &str, key: &str, path: &Path) -> Result<()>;
}

/// [`ObjectStore`] backed by Amazon S3.
pub struct S3Store {
    client: S3Client,
}

impl S3Store {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    pub fn from_conf(config: &aws_config::SdkConfig) -> Self {
        Self::new(S3Client::new(config))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn upload(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| Error::Aws(format!("Failed to read {}: {}", path.display(), e)))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("text/csv")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to upload to s3://{}/{}: {}", bucket, key, e)))?;

        info!("Uploaded {} to s3://{}/{}", path.display(), bucket, key);
        Ok(())
    }
}

/// Sanitized-to-original column mapping, in header order.
pub fn column_map(columns: &[ColumnPair]) -> Map<String, Value> {
    columns
        .iter()
        .map(|pair| (pair.sanitized.clone(), Value::String(pair.original.clone())))
        .collect()
}

/// Write the column map as pretty JSON, creating parent directories.
pub fn write_column_map(columns: &[ColumnPair], destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&column_map(columns))?;
    std::fs::write(destination, json)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Store that records uploads and can be told to reject a file name.
    #[derive(Default)]
    pub struct MemoryStore {
        pub uploads: Mutex<Vec<(String, String, PathBuf)>>,
        pub reject: Option<String>,
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn upload(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
            if self.reject.as_deref().is_some_and(|name| key.contains(name)) {
                return Err(Error::Aws(format!("Failed to upload to s3://{}/{}: AccessDenied", bucket, key)));
            }
            self.uploads
                .lock()
                .unwrap()
                .push((bucket.to_string(), key.to_string(), path.to_path_buf()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::identifiers::unique_identifiers;

    #[test]
    fn test_layout_with_prefix() {
        let layout = ObjectLayout::for_file(
            "data-bucket",
            "/custom/",
            "test_population",
            Path::new("/tmp/Test Population (C).csv"),
        );
        assert_eq!(layout.key, "custom/test_population/test_population_c.csv");
        assert_eq!(layout.location, "s3://data-bucket/custom/test_population/");
    }

    #[test]
    fn test_layout_without_folders() {
        let layout = ObjectLayout::for_file("b", "", "", Path::new("sales.csv"));
        assert_eq!(layout.key, "sales.csv");
        assert_eq!(layout.location, "s3://b/");
    }

    #[test]
    fn test_write_column_map_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("maps").join("customers.json");
        let columns = unique_identifiers(["VIP", "Customer ID"]);

        write_column_map(&columns, &destination).unwrap();

        let written = std::fs::read_to_string(&destination).unwrap();
        assert_eq!(
            written,
            "{\n  \"vip\": \"VIP\",\n  \"customer_id\": \"Customer ID\"\n}"
        );
    }
}
