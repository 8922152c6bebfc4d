//! Configuration for the agent issuers and the ingestion tooling.

use serde::Deserialize;
use std::env;
use std::path::Path;

use crate::{Error, Result};

/// Region used when neither `BEDROCK_REGION` nor `AWS_REGION` is set.
pub const DEFAULT_REGION: &str = "eu-central-1";

/// Agent configuration loaded once at startup and passed to issuers explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentConfig {
    /// Bedrock agent ID
    pub agent_id: Option<String>,
    /// Bedrock agent alias ID
    pub agent_alias_id: Option<String>,
    /// Region hosting the agent runtime
    pub region: String,
}

impl AgentConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary lookup function.
    ///
    /// `BEDROCK_REGION` takes precedence over `AWS_REGION`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            agent_id: non_blank("AGENT_ID"),
            agent_alias_id: non_blank("AGENT_ALIAS_ID"),
            region: non_blank("BEDROCK_REGION")
                .or_else(|| non_blank("AWS_REGION"))
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        }
    }

    /// Resolve a concrete target, letting per-request overrides win over configured IDs.
    pub fn target(
        &self,
        agent_id: Option<&str>,
        agent_alias_id: Option<&str>,
    ) -> Result<AgentTarget> {
        let pick = |request: Option<&str>, configured: &Option<String>| {
            request
                .filter(|v| !v.trim().is_empty())
                .map(String::from)
                .or_else(|| configured.clone())
        };

        match (
            pick(agent_id, &self.agent_id),
            pick(agent_alias_id, &self.agent_alias_id),
        ) {
            (Some(agent_id), Some(agent_alias_id)) => Ok(AgentTarget {
                agent_id,
                agent_alias_id,
                region: self.region.clone(),
            }),
            _ => Err(Error::Validation(
                "Agent ID and Alias ID are required".to_string(),
            )),
        }
    }
}

/// Fully resolved agent coordinates for a single invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTarget {
    pub agent_id: String,
    pub agent_alias_id: String,
    pub region: String,
}

/// Batch ingestion settings read from the ingestion config file.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestionConfig {
    /// Target S3 bucket for data upload
    #[serde(default)]
    pub bucket: String,
    /// S3 location (s3://bucket/prefix/) for Athena query results
    #[serde(default)]
    pub athena_output: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_quote_char")]
    pub quote_char: char,
    #[serde(default)]
    pub create_view: bool,
    #[serde(default = "default_view_suffix")]
    pub view_suffix: String,
    /// Directory (relative to the config root) receiving per-table column maps
    pub column_map_dir: Option<String>,
    pub table_name_prefix: Option<String>,
    pub region: Option<String>,
}

fn default_database() -> String {
    "athena_db".to_string()
}

fn default_prefix() -> String {
    "custom".to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_quote_char() -> char {
    '"'
}

fn default_view_suffix() -> String {
    "view".to_string()
}

impl IngestionConfig {
    /// Read and validate the config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Configuration file not found: {} ({}). Copy config/ingestion-config-example.json \
                 to ingestion-config.json and update it with your environment-specific values.",
                path.display(),
                e
            ))
        })?;

        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Ensure every required key carries a value.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [("bucket", &self.bucket), ("athena_output", &self.athena_output)]
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| key)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "Missing required configuration values: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Load shared AWS configuration, optionally pinned to a region.
pub async fn load_aws_config(region: Option<String>) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(aws_config::Region::new(region));
    }
    loader.load().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_bedrock_region_wins() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("AWS_REGION", "us-west-2"),
            ("BEDROCK_REGION", "us-east-1"),
        ]));
        assert_eq!(config.region, "us-east-1");
    }

    #[test]
    fn test_default_region() {
        let config = AgentConfig::from_lookup(lookup(&[("AGENT_ID", "A1")]));
        assert_eq!(config.region, DEFAULT_REGION);
        assert_eq!(config.agent_id.as_deref(), Some("A1"));
        assert_eq!(config.agent_alias_id, None);
    }

    #[test]
    fn test_target_prefers_request_ids() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("AGENT_ID", "ENV_AGENT"),
            ("AGENT_ALIAS_ID", "ENV_ALIAS"),
        ]));

        let target = config.target(Some("REQ_AGENT"), None).unwrap();
        assert_eq!(target.agent_id, "REQ_AGENT");
        assert_eq!(target.agent_alias_id, "ENV_ALIAS");
    }

    #[test]
    fn test_target_missing_alias() {
        let config = AgentConfig::from_lookup(lookup(&[("AGENT_ID", "A1")]));
        let err = config.target(None, Some("  ")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("Agent ID and Alias ID are required"));
    }

    #[test]
    fn test_ingestion_defaults() {
        let config: IngestionConfig = serde_json::from_str(
            r#"{"bucket":"data","athena_output":"s3://results/"}"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.database, "athena_db");
        assert_eq!(config.prefix, "custom");
        assert_eq!(config.delimiter, ',');
        assert_eq!(config.quote_char, '"');
        assert!(!config.create_view);
        assert_eq!(config.view_suffix, "view");
    }

    #[test]
    fn test_ingestion_missing_required() {
        let config: IngestionConfig = serde_json::from_str(r#"{"database":"db"}"#).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err
            .to_string()
            .contains("Missing required configuration values: bucket, athena_output"));
    }
}
