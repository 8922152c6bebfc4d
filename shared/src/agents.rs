//! Bedrock agent client for forwarding questions through the managed SDK.

use async_trait::async_trait;
use aws_sdk_bedrockagentruntime::types::ResponseStream;
use aws_sdk_bedrockagentruntime::Client as BedrockAgentClient;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::AgentTarget;
use crate::decoder::{decode, AgentPayload, Chunk, DecodedResponse};
use crate::{Error, Result};

/// A single question for the agent.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    /// Conversation/session ID
    pub session_id: String,
    /// User's question
    pub question: String,
    /// Ask the agent to close the session after answering
    pub end_session: bool,
}

impl AgentRequest {
    pub fn new(session_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            question: question.into(),
            end_session: false,
        }
    }

    /// Mark this request as the last one of its session.
    pub fn ending_session(mut self) -> Self {
        self.end_session = true;
        self
    }
}

/// Anything able to send a question to an agent and decode the answer.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(&self, target: &AgentTarget, request: &AgentRequest) -> Result<DecodedResponse>;
}

/// Client for invoking the agent through the Bedrock Agent Runtime SDK.
pub struct AgentClient {
    client: BedrockAgentClient,
}

impl AgentClient {
    /// Create a new agent client.
    pub fn new(client: BedrockAgentClient) -> Self {
        Self { client }
    }

    /// Create a client from shared AWS configuration.
    pub fn from_conf(config: &aws_config::SdkConfig) -> Self {
        Self::new(BedrockAgentClient::new(config))
    }
}

#[async_trait]
impl AgentInvoker for AgentClient {
    async fn invoke(&self, target: &AgentTarget, request: &AgentRequest) -> Result<DecodedResponse> {
        info!(
            "Invoking agent {} (alias {}) for session {}",
            target.agent_id, target.agent_alias_id, request.session_id
        );

        let mut output = self
            .client
            .invoke_agent()
            .agent_id(&target.agent_id)
            .agent_alias_id(&target.agent_alias_id)
            .session_id(&request.session_id)
            .input_text(&request.question)
            .end_session(request.end_session)
            .enable_trace(false)
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to invoke agent: {}", e)))?;

        let mut chunks = Vec::new();
        let mut events = Vec::new();

        while let Some(event) = output
            .completion
            .recv()
            .await
            .map_err(|e| Error::Aws(format!("Failed to read agent response stream: {}", e)))?
        {
            match event {
                ResponseStream::Chunk(part) => {
                    if let Some(bytes) = part.bytes() {
                        chunks.push(Chunk::raw(bytes.as_ref()));
                    }
                }
                ResponseStream::Trace(trace) => {
                    events.push(format!("trace: {:?}", trace.trace()));
                }
                other => {
                    debug!("Ignoring response stream event: {:?}", other);
                    events.push(format!("ignored event: {:?}", other));
                }
            }
        }

        let mut decoded = decode(AgentPayload::Chunks(&chunks));
        events.append(&mut decoded.diagnostics);
        decoded.diagnostics = events;

        info!(
            "Agent answered with {} chunk(s), {} character(s)",
            chunks.len(),
            decoded.primary_text.chars().count()
        );

        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = AgentRequest::new("s-1", "How many customers?").ending_session();
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["sessionId"], "s-1");
        assert_eq!(value["question"], "How many customers?");
        assert_eq!(value["endSession"], true);
    }
}
