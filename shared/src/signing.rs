//! SigV4-signed HTTP invocation of the agent runtime.
//!
//! Used by the desktop client, which talks to the runtime endpoint directly
//! instead of going through the SDK's event-stream machinery.

use async_trait::async_trait;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use serde::Serialize;
use std::time::SystemTime;
use tracing::{error, info};

use crate::agents::{AgentInvoker, AgentRequest};
use crate::config::AgentTarget;
use crate::decoder::{decode, AgentPayload, DecodedResponse};
use crate::{Error, Result};

/// Signing name of the agent runtime.
const SIGNING_SERVICE: &str = "bedrock";

/// Body of a signed invocation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InvocationBody<'a> {
    input_text: &'a str,
    enable_trace: bool,
    end_session: bool,
}

/// Regional runtime endpoint for a region.
pub fn runtime_endpoint(region: &str) -> String {
    format!("https://bedrock-agent-runtime.{}.amazonaws.com", region)
}

/// Invocation URL for a target and session under an endpoint base.
pub fn invocation_url(endpoint: &str, target: &AgentTarget, session_id: &str) -> String {
    format!(
        "{}/agents/{}/agentAliases/{}/sessions/{}/text",
        endpoint.trim_end_matches('/'),
        target.agent_id,
        target.agent_alias_id,
        session_id
    )
}

/// Client sending manually signed requests to the agent runtime.
pub struct SignedAgentClient {
    http_client: reqwest::Client,
    credentials: SharedCredentialsProvider,
    endpoint: Option<String>,
}

impl SignedAgentClient {
    pub fn new(credentials: SharedCredentialsProvider) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            credentials,
            endpoint: None,
        }
    }

    /// Create a client using the credential chain of the shared AWS configuration.
    pub fn from_conf(config: &aws_config::SdkConfig) -> Result<Self> {
        let credentials = config.credentials_provider().ok_or_else(|| {
            Error::Config("No AWS credentials provider configured".to_string())
        })?;
        Ok(Self::new(credentials))
    }

    /// Send requests to a fixed endpoint instead of the regional runtime.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn url_for(&self, target: &AgentTarget, session_id: &str) -> String {
        let endpoint = self
            .endpoint
            .clone()
            .unwrap_or_else(|| runtime_endpoint(&target.region));
        invocation_url(&endpoint, target, session_id)
    }

    async fn signed_headers(
        &self,
        url: &str,
        region: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<Vec<(String, String)>> {
        let credentials: Credentials = self
            .credentials
            .provide_credentials()
            .await
            .map_err(|e| Error::Signing(format!("Failed to load credentials: {}", e)))?;
        let identity = credentials.into();

        let signing_params = v4::SigningParams::builder()
            .identity(&identity)
            .region(region)
            .name(SIGNING_SERVICE)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| Error::Signing(e.to_string()))?
            .into();

        let signable = SignableRequest::new(
            "POST",
            url,
            headers.iter().copied(),
            SignableBody::Bytes(body),
        )
        .map_err(|e| Error::Signing(e.to_string()))?;

        let (instructions, _signature) = sign(signable, &signing_params)
            .map_err(|e| Error::Signing(e.to_string()))?
            .into_parts();

        Ok(instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

#[async_trait]
impl AgentInvoker for SignedAgentClient {
    async fn invoke(&self, target: &AgentTarget, request: &AgentRequest) -> Result<DecodedResponse> {
        let url = self.url_for(target, &request.session_id);
        info!("Calling Bedrock agent at: {}", url);

        let body = serde_json::to_vec(&InvocationBody {
            input_text: &request.question,
            enable_trace: true,
            end_session: request.end_session,
        })?;

        let base_headers = [
            ("content-type", "application/json"),
            ("accept", "application/json"),
        ];
        let auth_headers = self
            .signed_headers(&url, &target.region, &base_headers, &body)
            .await?;

        let mut builder = self.http_client.post(&url).body(body);
        for (name, value) in base_headers {
            builder = builder.header(name, value);
        }
        for (name, value) in &auth_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();

        if status != reqwest::StatusCode::OK {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error message".to_string());
            error!("Agent endpoint returned {}: {}", status, text);
            return Err(Error::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let raw = response.bytes().await?;
        let raw = String::from_utf8_lossy(&raw);
        info!("Received {} byte(s) from agent endpoint", raw.len());

        Ok(decode(AgentPayload::EventStream(&raw)))
    }
}
