//! Print an Athena table schema formatted for the agent's orchestration prompt.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shared::catalog::ddl::{schema_from_column_map, wrap_athena_schema};
use shared::catalog::{AthenaExecutor, QueryRunner};
use shared::config::{load_aws_config, DEFAULT_REGION};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read the schema of an existing table through Athena
    Live {
        /// Athena database name
        #[arg(long)]
        database: String,

        /// Table name
        #[arg(long)]
        table: String,

        /// S3 path for Athena query results
        #[arg(long)]
        athena_output: String,

        /// AWS region
        #[arg(long, default_value = DEFAULT_REGION)]
        region: String,
    },
    /// Build the schema offline from a persisted column map
    ColumnMap {
        /// Column map JSON written during ingestion
        #[arg(long)]
        column_map: PathBuf,

        /// Athena database name
        #[arg(long)]
        database: String,

        /// Table name
        #[arg(long)]
        table: String,

        /// S3 location of the table data (s3://bucket/prefix/table/)
        #[arg(long)]
        location: String,
    },
}

const RULE: &str = "================================================================================";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let schema = match Cli::parse().command {
        Command::Live {
            database,
            table,
            athena_output,
            region,
        } => {
            let sdk_config = load_aws_config(Some(region)).await;
            let runner = QueryRunner::new(AthenaExecutor::from_conf(&sdk_config), athena_output);

            runner.table_schema(&database, &table).await?
        }
        Command::ColumnMap {
            column_map,
            database,
            table,
            location,
        } => {
            let raw = std::fs::read_to_string(&column_map)
                .with_context(|| format!("Failed to read {}", column_map.display()))?;
            let map: BTreeMap<String, String> = serde_json::from_str(&raw)?;
            schema_from_column_map(&database, &table, &map, &location)
        }
    };

    println!("\n{}\nTABLE SCHEMA FOR BEDROCK AGENT:\n{}", RULE, RULE);
    println!("{}\n{}", schema, RULE);

    println!("\n{}\nXML FORMAT (for Bedrock agent orchestration prompt):\n{}", RULE, RULE);
    println!("{}\n{}", wrap_athena_schema(&schema), RULE);
    Ok(())
}
