//! Add human-readable column descriptions to the Glue Data Catalog.
//!
//! Comments become visible to the agent through `DESCRIBE` queries.

use anyhow::Result;
use clap::Parser;
use shared::catalog::glue::load_descriptions;
use shared::catalog::GlueCatalog;
use shared::config::load_aws_config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file of the form {"table": {"column": "description"}}
    #[arg(long)]
    descriptions: PathBuf,

    /// Glue database name
    #[arg(long)]
    database: String,

    /// AWS region (defaults to AWS config)
    #[arg(long)]
    region: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let descriptions = load_descriptions(&cli.descriptions)?;

    let sdk_config = load_aws_config(cli.region).await;
    let catalog = GlueCatalog::from_conf(&sdk_config);

    println!("Updating column descriptions in database: {}\n", cli.database);

    let mut success_count = 0;
    for (table, columns) in &descriptions {
        println!("Table: {}", table);
        match catalog
            .update_column_descriptions(&cli.database, table, columns)
            .await
        {
            Ok(updated) => {
                println!("Updated {} column descriptions for {}\n", updated, table);
                success_count += 1;
            }
            Err(e) => {
                error!("Error updating {}: {}", table, e);
                println!("Error updating {}: {}\n", table, e);
            }
        }
    }

    println!(
        "Complete! Updated {}/{} tables",
        success_count,
        descriptions.len()
    );

    if success_count == descriptions.len() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
