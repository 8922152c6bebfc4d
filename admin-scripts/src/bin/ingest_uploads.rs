//! Batch-ingest CSV files dropped into the upload directory.

use anyhow::{Context, Result};
use clap::Parser;
use shared::catalog::ingest::pending_csv_files;
use shared::catalog::{AthenaExecutor, BatchOptions, Ingestor, QueryRunner, S3Store};
use shared::config::load_aws_config;
use shared::IngestionConfig;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to ingestion configuration JSON file
    #[arg(long, default_value = "config/ingestion-config.json")]
    config: PathBuf,

    /// Directory to scan for CSV files
    #[arg(long, default_value = "data/uploads")]
    upload_dir: PathBuf,

    /// Directory to move successfully ingested files (defaults to <upload-dir>/processed)
    #[arg(long)]
    processed_dir: Option<PathBuf>,

    /// Maximum number of CSV files to process in one run
    #[arg(long)]
    limit: Option<usize>,

    /// Skip uploading the CSVs (assume they are already in S3)
    #[arg(long)]
    skip_upload: bool,

    /// Skip running Athena DDL statements
    #[arg(long)]
    skip_ddl: bool,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = IngestionConfig::load(&cli.config)?;

    std::fs::create_dir_all(&cli.upload_dir)
        .with_context(|| format!("Failed to create {}", cli.upload_dir.display()))?;
    let processed_dir = cli
        .processed_dir
        .unwrap_or_else(|| cli.upload_dir.join("processed"));

    let files = pending_csv_files(&cli.upload_dir, cli.limit)?;
    if files.is_empty() {
        println!(
            "No CSV files found in {}. Nothing to ingest.",
            cli.upload_dir.display()
        );
        return Ok(ExitCode::SUCCESS);
    }
    println!(
        "Found {} CSV file(s) to ingest from {}.",
        files.len(),
        cli.upload_dir.display()
    );

    let column_map_dir = config.column_map_dir.as_ref().map(PathBuf::from);
    if let Some(dir) = &column_map_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let sdk_config = load_aws_config(config.region.clone()).await;
    let ingestor = Ingestor::new(
        S3Store::from_conf(&sdk_config),
        QueryRunner::new(
            AthenaExecutor::from_conf(&sdk_config),
            config.athena_output.clone(),
        ),
    );

    let batch = BatchOptions {
        processed_dir,
        column_map_dir,
        skip_upload: cli.skip_upload,
        skip_ddl: cli.skip_ddl,
    };
    let report = ingestor.ingest_batch(&config, &files, &batch).await;

    println!("\n================ Summary ================");
    if report.successes.is_empty() {
        println!("No files ingested successfully.");
    }
    for (file, summary) in &report.successes {
        println!("SUCCESS: {} -> {}", file_name(file), summary.table);
    }

    if report.has_failures() {
        println!("\nIssues encountered:");
        for (file, reason) in &report.failures {
            println!("  {}: {}", file_name(file), reason);
        }
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}
