//! Agent proxy Lambda - Handles the browser-facing agent endpoint.
//!
//! Forwards a question to the Bedrock agent on behalf of a front end that holds no
//! AWS credentials, and returns the decoded answer with CORS headers.

use lambda_http::http::Method;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::{error_response, json_response, preflight_response, ErrorBody};
use shared::models::NO_RESPONSE;
use shared::{parse_body, AgentClient, AgentConfig, AgentInvoker, AgentRequest, ProxyRequest, ProxyResponse};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application state shared across requests.
struct AppState {
    invoker: Box<dyn AgentInvoker>,
    config: AgentConfig,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = AgentConfig::from_env();
        let sdk_config = shared::config::load_aws_config(Some(config.region.clone())).await;

        info!("Agent proxy configured for region {}", config.region);

        Ok(Self {
            invoker: Box::new(AgentClient::from_conf(&sdk_config)),
            config,
        })
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    if event.method() == Method::OPTIONS {
        return preflight_response();
    }

    let request: ProxyRequest = parse_body!(event.body());

    if request.question().is_empty() {
        return error_response(400, "Question is required");
    }

    let target = match state
        .config
        .target(request.agent_id.as_deref(), request.agent_alias_id.as_deref())
    {
        Ok(target) => target,
        Err(_) => return error_response(400, "Agent ID and Alias ID are required"),
    };

    let session_id = request.session_id().to_string();
    let agent_request = AgentRequest::new(&session_id, request.question());

    let decoded = match state.invoker.invoke(&target, &agent_request).await {
        Ok(decoded) => decoded,
        Err(e) => {
            error!("Agent invocation failed: {}", e);
            return json_response(500, &ErrorBody::with_kind(e.to_string(), e.kind()));
        }
    };

    if !decoded.diagnostics.is_empty() {
        info!("Decoder diagnostics: {}", decoded.trace_text());
    }

    json_response(
        200,
        &ProxyResponse {
            response: decoded.text_or(NO_RESPONSE).to_string(),
            session_id,
        },
    )
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
