//! CSV ingestion: upload to object storage and register tables in the catalog.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::athena::{QueryExecutor, QueryRunner};
use super::ddl::{create_database_sql, create_table_sql, create_view_sql, view_name, TableDefinition};
use super::identifiers::{read_csv_header, sanitize_identifier, unique_identifiers};
use super::storage::{write_column_map, ObjectLayout, ObjectStore};
use crate::config::IngestionConfig;
use crate::{Error, Result};

/// Settings for ingesting one CSV file.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub csv_path: PathBuf,
    pub bucket: String,
    pub prefix: String,
    /// Table name; derived from the file name when absent
    pub table_name: Option<String>,
    pub database: String,
    pub delimiter: char,
    pub quote_char: char,
    pub create_view: bool,
    pub view_suffix: String,
    pub column_map_output: Option<PathBuf>,
    pub skip_upload: bool,
    pub skip_ddl: bool,
}

impl IngestOptions {
    /// Options for one file of a batch run.
    pub fn from_config(config: &IngestionConfig, csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
            table_name: None,
            database: config.database.clone(),
            delimiter: config.delimiter,
            quote_char: config.quote_char,
            create_view: config.create_view,
            view_suffix: config.view_suffix.clone(),
            column_map_output: None,
            skip_upload: false,
            skip_ddl: false,
        }
    }
}

/// What a single ingestion produced.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionSummary {
    pub table: String,
    pub view: Option<String>,
    pub s3_location: String,
    pub s3_key: String,
    pub athena_output: String,
    pub total_columns: usize,
    pub column_map_path: Option<PathBuf>,
    pub upload_performed: bool,
    pub ddl_executed: bool,
}

/// Outcome of a batch run. Failures never abort the batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub successes: Vec<(PathBuf, IngestionSummary)>,
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Batch-specific settings on top of the ingestion config.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub processed_dir: PathBuf,
    /// Directory receiving one `<table>.json` column map per file
    pub column_map_dir: Option<PathBuf>,
    pub skip_upload: bool,
    pub skip_ddl: bool,
}

/// Uploads CSV files and registers them as tables.
pub struct Ingestor<S, E> {
    store: S,
    runner: QueryRunner<E>,
}

impl<S: ObjectStore, E: QueryExecutor> Ingestor<S, E> {
    pub fn new(store: S, runner: QueryRunner<E>) -> Self {
        Self { store, runner }
    }

    /// Ingest a single CSV file.
    pub async fn ingest(&self, options: &IngestOptions) -> Result<IngestionSummary> {
        let csv_path = &options.csv_path;
        if !csv_path.is_file() {
            return Err(Error::Validation(format!(
                "CSV file not found: {}",
                csv_path.display()
            )));
        }

        let headers = read_csv_header(csv_path, options.delimiter)?;
        let columns = unique_identifiers(&headers);

        let stem = file_stem(csv_path);
        let table = sanitize_identifier(options.table_name.as_deref().unwrap_or(&stem));
        let layout = ObjectLayout::for_file(&options.bucket, &options.prefix, &table, csv_path);
        let database = options.database.as_str();

        if options.skip_upload {
            info!("Skipping S3 upload as requested");
        } else {
            info!(
                "Uploading {} to s3://{}/{} ...",
                csv_path.display(),
                options.bucket,
                layout.key
            );
            self.store.upload(&options.bucket, &layout.key, csv_path).await?;
        }

        if options.skip_ddl {
            info!("Skipping Athena DDL execution as requested");
        } else {
            info!("Ensuring database {} exists ...", database);
            self.runner.run(&create_database_sql(database), None).await?;

            info!("Creating external table {}.{} ...", database, table);
            let ddl = create_table_sql(&TableDefinition {
                database,
                table: &table,
                columns: &columns,
                location: &layout.location,
                delimiter: options.delimiter,
                quote_char: options.quote_char,
            });
            self.runner.run(&ddl, Some(database)).await?;

            if options.create_view {
                info!(
                    "Creating view {}.{} with original column names ...",
                    database,
                    view_name(&table, &options.view_suffix)
                );
                let view_sql = create_view_sql(database, &table, &columns, &options.view_suffix);
                self.runner.run(&view_sql, Some(database)).await?;
            }
        }

        if let Some(destination) = &options.column_map_output {
            write_column_map(&columns, destination)?;
            info!("Column mapping written to {}", destination.display());
        }

        Ok(IngestionSummary {
            table: format!("{}.{}", database, table),
            view: options
                .create_view
                .then(|| format!("{}.{}", database, view_name(&table, &options.view_suffix))),
            s3_location: layout.location,
            s3_key: layout.key,
            athena_output: self.runner.output_location().to_string(),
            total_columns: columns.len(),
            column_map_path: options.column_map_output.clone(),
            upload_performed: !options.skip_upload,
            ddl_executed: !options.skip_ddl,
        })
    }

    /// Ingest every file, archiving successes into the processed directory.
    pub async fn ingest_batch(
        &self,
        config: &IngestionConfig,
        files: &[PathBuf],
        batch: &BatchOptions,
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for csv_file in files {
            let table = batch_table_name(&file_stem(csv_file), config.table_name_prefix.as_deref());

            let mut options = IngestOptions::from_config(config, csv_file);
            options.table_name = Some(table.clone());
            options.column_map_output = batch
                .column_map_dir
                .as_ref()
                .map(|dir| dir.join(format!("{}.json", table)));
            options.skip_upload = batch.skip_upload;
            options.skip_ddl = batch.skip_ddl;

            info!("--- Processing {} ---", display_name(csv_file));
            let summary = match self.ingest(&options).await {
                Ok(summary) => summary,
                Err(e) => {
                    error!("Failed to ingest {}: {}", display_name(csv_file), e);
                    report.failures.push((csv_file.clone(), e.to_string()));
                    continue;
                }
            };

            match move_to_processed(csv_file, &batch.processed_dir) {
                Ok(moved_to) => info!("Moved {} to {}", display_name(csv_file), moved_to.display()),
                Err(e) => {
                    warn!(
                        "Ingested {} but could not move to processed folder: {}",
                        display_name(csv_file),
                        e
                    );
                    report
                        .failures
                        .push((csv_file.clone(), format!("Ingested but failed to archive: {}", e)));
                }
            }
            report.successes.push((csv_file.clone(), summary));
        }

        report
    }
}

/// Table name for a batch file, with the optional configured prefix.
pub fn batch_table_name(stem: &str, table_name_prefix: Option<&str>) -> String {
    let candidate = sanitize_identifier(stem);
    match table_name_prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => sanitize_identifier(&format!("{}_{}", prefix, candidate)),
        None => candidate,
    }
}

/// `*.csv` files directly inside `upload_dir`, sorted, at most `limit` of them.
pub fn pending_csv_files(upload_dir: &Path, limit: Option<usize>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(upload_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();
    if let Some(limit) = limit {
        files.truncate(limit);
    }
    Ok(files)
}

/// Move a file into `processed_dir`, appending `-1`, `-2`, ... on name collisions.
pub fn move_to_processed(src: &Path, processed_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(processed_dir)?;

    let file_name = src
        .file_name()
        .ok_or_else(|| Error::Validation(format!("{} has no file name", src.display())))?;
    let mut destination = processed_dir.join(file_name);

    if destination.exists() {
        let stem = file_stem(&destination);
        let extension = destination
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let mut counter = 1;
        loop {
            let candidate = processed_dir.join(format!("{}-{}{}", stem, counter, extension));
            if !candidate.exists() {
                destination = candidate;
                break;
            }
            counter += 1;
        }
    }

    if std::fs::rename(src, &destination).is_err() {
        std::fs::copy(src, &destination)?;
        std::fs::remove_file(src)?;
    }
    Ok(destination)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
