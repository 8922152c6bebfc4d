//! Draft table metadata JSON from a sample of a CSV file.
//!
//! The JSON goes to stdout, progress to stderr:
//! `table_metadata input.csv --table-name sales_2024 > metadata/sales_2024.json`

use anyhow::{Context, Result};
use clap::Parser;
use shared::catalog::metadata::{analyze_csv, metadata_json, DEFAULT_SAMPLE_SIZE};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to CSV file
    csv_file: PathBuf,

    /// Table name
    #[arg(long)]
    table_name: Option<String>,

    /// Number of rows to analyze
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    sample_size: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("Analyzing CSV file {}", cli.csv_file.display());
    let analysis = analyze_csv(&cli.csv_file, cli.sample_size)
        .with_context(|| format!("Failed to analyze {}", cli.csv_file.display()))?;
    info!("Found {} columns", analysis.headers.len());
    info!("Analyzed {} rows", analysis.total_rows);

    let metadata = metadata_json(&analysis, cli.table_name.as_deref());
    println!("{}", serde_json::to_string_pretty(&metadata)?);

    info!("Please review the generated descriptions and add domain knowledge");
    Ok(())
}
