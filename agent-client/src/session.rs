//! One agent session as seen by the desktop client.

use shared::{AgentConfig, AgentInvoker, AgentRequest, Conversation};
use tracing::{error, info, warn};

pub const NO_QUESTION: &str = "Error: No question provided";
pub const NOT_CONFIGURED: &str = "Error: Agent ID or Alias ID not configured. Please set AGENT_ID and AGENT_ALIAS_ID environment variables.";
pub const NO_CONTENT: &str = "No response content received from agent";
pub const NO_TRACE: &str = "No trace data available";

pub const END_SESSION_QUESTION: &str = "placeholder to end session";
pub const FAREWELL: &str = "Thank you for using AnyCompany Support Agent!";

pub struct ClientSession<I> {
    invoker: I,
    config: AgentConfig,
    session_id: String,
    conversation: Conversation,
    last_trace: String,
}

impl<I: AgentInvoker> ClientSession<I> {
    pub fn new(invoker: I, config: AgentConfig, session_id: impl Into<String>) -> Self {
        Self {
            invoker,
            config,
            session_id: session_id.into(),
            conversation: Conversation::new(),
            last_trace: String::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Diagnostics of the most recent answer.
    pub fn last_trace(&self) -> &str {
        if self.last_trace.trim().is_empty() {
            NO_TRACE
        } else {
            &self.last_trace
        }
    }

    /// Ask a question and record the turn. Failures become the answer text.
    pub async fn ask(&mut self, question: &str) -> String {
        let question = question.trim();
        if question.is_empty() {
            return NO_QUESTION.to_string();
        }

        info!("Session: {} asked question: {}", self.session_id, question);
        let request = AgentRequest::new(&self.session_id, question);
        let answer = self.send(request).await;
        self.conversation.push(question, answer.clone());
        answer
    }

    /// Tell the agent the session is over and forget the history.
    pub async fn end(&mut self) -> &'static str {
        let request = AgentRequest::new(&self.session_id, END_SESSION_QUESTION).ending_session();
        let answer = self.send(request).await;
        if answer.starts_with("Error:") {
            warn!("Ending session {} failed: {}", self.session_id, answer);
        }
        self.conversation.clear();
        self.last_trace.clear();
        FAREWELL
    }

    async fn send(&mut self, request: AgentRequest) -> String {
        let target = match self.config.target(None, None) {
            Ok(target) => target,
            Err(_) => {
                error!("{}", NOT_CONFIGURED);
                return NOT_CONFIGURED.to_string();
            }
        };

        match self.invoker.invoke(&target, &request).await {
            Ok(decoded) => {
                self.last_trace = decoded.trace_text();
                decoded.text_or(NO_CONTENT).to_string()
            }
            Err(e) => {
                error!("Agent request failed: {}", e);
                self.last_trace = e.to_string();
                format!("Error: {}", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shared::{AgentTarget, DecodedResponse};
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct FakeInvoker {
        answer: String,
        fail: bool,
        requests: Arc<Mutex<Vec<AgentRequest>>>,
    }

    #[async_trait]
    impl AgentInvoker for FakeInvoker {
        async fn invoke(&self, _target: &AgentTarget, request: &AgentRequest) -> shared::Result<DecodedResponse> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(shared::Error::Status {
                    status: 403,
                    body: "Forbidden".to_string(),
                });
            }
            Ok(DecodedResponse {
                primary_text: self.answer.clone(),
                diagnostics: vec!["Decoded 1 chunk".to_string()],
            })
        }
    }

    fn configured() -> AgentConfig {
        AgentConfig {
            agent_id: Some("AGENT".to_string()),
            agent_alias_id: Some("ALIAS".to_string()),
            region: "eu-central-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ask_records_turn() {
        let invoker = FakeInvoker {
            answer: "There are 12 VIP customers.".to_string(),
            ..Default::default()
        };
        let mut session = ClientSession::new(invoker.clone(), configured(), "desktop-1");

        let answer = session.ask("  How many VIPs?  ").await;
        assert_eq!(answer, "There are 12 VIP customers.");
        assert_eq!(session.conversation().len(), 1);
        assert_eq!(session.last_trace(), "Decoded 1 chunk");

        let requests = invoker.requests.lock().unwrap();
        assert_eq!(requests[0].question, "How many VIPs?");
        assert_eq!(requests[0].session_id, "desktop-1");
    }

    #[tokio::test]
    async fn test_empty_question_is_not_sent() {
        let invoker = FakeInvoker::default();
        let mut session = ClientSession::new(invoker.clone(), configured(), "s");

        assert_eq!(session.ask("   ").await, NO_QUESTION);
        assert!(session.conversation().is_empty());
        assert!(invoker.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_agent() {
        let mut session = ClientSession::new(FakeInvoker::default(), AgentConfig::default(), "s");
        assert_eq!(session.ask("hi").await, NOT_CONFIGURED);
        assert_eq!(session.conversation().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_becomes_answer() {
        let invoker = FakeInvoker {
            fail: true,
            ..Default::default()
        };
        let mut session = ClientSession::new(invoker, configured(), "s");

        let answer = session.ask("hi").await;
        assert_eq!(answer, "Error: HTTP Error 403: Forbidden");
    }

    #[tokio::test]
    async fn test_empty_answer_placeholder() {
        let mut session = ClientSession::new(FakeInvoker::default(), configured(), "s");
        assert_eq!(session.ask("hi").await, NO_CONTENT);
    }

    #[tokio::test]
    async fn test_end_session_clears_history() {
        let invoker = FakeInvoker::default();
        let mut session = ClientSession::new(invoker.clone(), configured(), "s");
        session.ask("hi").await;

        assert_eq!(session.end().await, FAREWELL);
        assert!(session.conversation().is_empty());
        assert_eq!(session.last_trace(), NO_TRACE);

        let requests = invoker.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let last = requests.last().unwrap();
        assert_eq!(last.question, END_SESSION_QUESTION);
        assert!(last.end_session);
    }
}
