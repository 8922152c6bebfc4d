//! Wire models of the agent proxy endpoint.

use serde::{Deserialize, Serialize};

/// Session used when the caller does not name one.
pub const DEFAULT_WEB_SESSION: &str = "web-session";

/// Answer sent when decoding produced nothing.
pub const NO_RESPONSE: &str = "No response received";

/// Body of a proxy request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    pub agent_id: Option<String>,
    pub agent_alias_id: Option<String>,
    pub session_id: Option<String>,
    pub question: Option<String>,
}

impl ProxyRequest {
    /// The question, empty when absent or null.
    pub fn question(&self) -> &str {
        self.question.as_deref().unwrap_or_default()
    }

    pub fn session_id(&self) -> &str {
        self.session_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_WEB_SESSION)
    }
}

/// Body of a successful proxy response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub response: String,
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let request: ProxyRequest = serde_json::from_str(
            r#"{"agentId":"A1","agentAliasId":"TSTALIASID","sessionId":"s-9","question":"hi"}"#,
        )
        .unwrap();
        assert_eq!(request.agent_id.as_deref(), Some("A1"));
        assert_eq!(request.agent_alias_id.as_deref(), Some("TSTALIASID"));
        assert_eq!(request.session_id(), "s-9");
        assert_eq!(request.question(), "hi");
    }

    #[test]
    fn test_default_session() {
        let request: ProxyRequest = serde_json::from_str(r#"{"question":"hi"}"#).unwrap();
        assert_eq!(request.session_id(), DEFAULT_WEB_SESSION);
    }

    #[test]
    fn test_null_question_is_empty() {
        let request: ProxyRequest = serde_json::from_str(r#"{"question":null,"sessionId":null}"#).unwrap();
        assert_eq!(request.question(), "");
        assert_eq!(request.session_id(), DEFAULT_WEB_SESSION);
    }

    #[test]
    fn test_response_shape() {
        let body = serde_json::to_value(ProxyResponse {
            response: "42".to_string(),
            session_id: "web-session".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"response": "42", "sessionId": "web-session"}));
    }
}
