//! Upload a local CSV file to S3 and register it as an Athena table.

use anyhow::Result;
use clap::Parser;
use shared::catalog::{AthenaExecutor, IngestOptions, Ingestor, QueryRunner, S3Store};
use shared::config::load_aws_config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to local CSV file
    #[arg(long)]
    csv_path: PathBuf,

    /// Target S3 bucket for data upload
    #[arg(long)]
    bucket: String,

    /// S3 prefix (folder) to place the file under
    #[arg(long, default_value = "custom")]
    prefix: String,

    /// Name for the Athena table (sanitized automatically if omitted)
    #[arg(long)]
    table_name: Option<String>,

    /// Athena database to use / create
    #[arg(long, default_value = "athena_db")]
    database: String,

    /// S3 location (s3://bucket/prefix/) for Athena query results
    #[arg(long)]
    athena_output: String,

    /// AWS region (defaults to AWS config)
    #[arg(long)]
    region: Option<String>,

    /// CSV delimiter
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// CSV quote character
    #[arg(long, default_value_t = '"')]
    quote_char: char,

    /// Create a companion view exposing the original column names
    #[arg(long)]
    create_view: bool,

    /// Suffix appended to the table name when creating the view
    #[arg(long, default_value = "view")]
    view_suffix: String,

    /// Save the sanitized-to-original column mapping as JSON
    #[arg(long)]
    column_map_output: Option<PathBuf>,

    /// Skip uploading to S3 (useful if file already present)
    #[arg(long)]
    skip_upload: bool,

    /// Skip executing Athena DDL statements
    #[arg(long)]
    skip_ddl: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let sdk_config = load_aws_config(cli.region).await;
    let ingestor = Ingestor::new(
        S3Store::from_conf(&sdk_config),
        QueryRunner::new(AthenaExecutor::from_conf(&sdk_config), cli.athena_output),
    );

    let options = IngestOptions {
        csv_path: cli.csv_path,
        bucket: cli.bucket,
        prefix: cli.prefix,
        table_name: cli.table_name,
        database: cli.database,
        delimiter: cli.delimiter,
        quote_char: cli.quote_char,
        create_view: cli.create_view,
        view_suffix: cli.view_suffix,
        column_map_output: cli.column_map_output,
        skip_upload: cli.skip_upload,
        skip_ddl: cli.skip_ddl,
    };

    let summary = ingestor.ingest(&options).await?;

    println!("\nIngestion summary:");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
