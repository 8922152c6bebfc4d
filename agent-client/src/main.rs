//! Interactive terminal client calling the agent runtime with SigV4-signed requests.

mod render;
mod repl;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use shared::config::{load_aws_config, DEFAULT_REGION};
use shared::{AgentConfig, SignedAgentClient};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::repl::Repl;
use crate::session::ClientSession;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Bedrock agent ID
    #[arg(long, env = "AGENT_ID")]
    agent_id: Option<String>,

    /// Bedrock agent alias ID
    #[arg(long, env = "AGENT_ALIAS_ID")]
    agent_alias_id: Option<String>,

    /// Region hosting the agent runtime
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// Session ID (a fresh one is generated when omitted)
    #[arg(long)]
    session_id: Option<String>,

    /// Override the runtime endpoint base URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Print trace data after every answer
    #[arg(long)]
    show_trace: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    let config = AgentConfig {
        agent_id: non_blank(cli.agent_id),
        agent_alias_id: non_blank(cli.agent_alias_id),
        region: cli.region,
    };

    let sdk_config = load_aws_config(Some(config.region.clone())).await;
    let mut invoker =
        SignedAgentClient::from_conf(&sdk_config).context("Failed to set up request signing")?;
    if let Some(endpoint) = cli.endpoint {
        invoker = invoker.with_endpoint(endpoint);
    }

    let session_id = cli
        .session_id
        .unwrap_or_else(|| format!("desktop-{}", Uuid::new_v4()));

    let session = ClientSession::new(invoker, config, session_id);
    Repl::new(session, cli.show_trace)?.run().await
}
