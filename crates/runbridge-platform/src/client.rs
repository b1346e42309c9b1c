//! Platform HTTP Client
//!
//! [`HttpPlatformClient`] implements [`AgentPlatform`] over an
//! assistants-style REST API. Every request carries the `api-version` query
//! parameter and the configured authentication.
//!
//! # Error Handling
//!
//! | Status | Error Type | Retryable |
//! |--------|------------|-----------|
//! | 400 | `InvalidRequest` | No |
//! | 401 | `AuthenticationRequired` | No |
//! | 403 | `NotAuthorized` | No |
//! | 404 | `NotFound` | No |
//! | 409 | `Conflict` | No |
//! | 429 | `RateLimited` | Yes |
//! | 5xx | `Unavailable` | Yes |
//! | connect / timeout | `Transport` | Yes |
//!
//! The client does not retry on its own; the run driver owns the retry
//! policy.

use crate::config::{AuthConfig, PlatformConfig};
use crate::wire::{
    AgentObject, CreateAgentRequest, CreateMessageRequest, CreateRunRequest, ListObject,
    MessageObject, RunObject, SubmitToolOutputsRequest, ThreadObject,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use runbridge_core::{
    Agent, AgentId, AgentPlatform, AgentSpec, PlatformError, PlatformResult, Role, Run, RunId,
    ThreadId, ThreadMessage, ToolOutput,
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Page size requested when listing messages
const MESSAGE_PAGE_SIZE: &str = "100";

/// HTTP implementation of [`AgentPlatform`]
#[derive(Clone)]
pub struct HttpPlatformClient {
    /// Project base URL, always ending with `/`
    base_url: Url,
    api_version: String,
    http: Client,
    auth: Option<AuthConfig>,
}

impl std::fmt::Debug for HttpPlatformClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPlatformClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &self.api_version)
            .field("has_auth", &self.auth.is_some())
            .finish()
    }
}

impl HttpPlatformClient {
    /// Create a client from a validated configuration
    pub fn new(config: PlatformConfig) -> PlatformResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(format!("runbridge/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlatformError::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_http_client(config, http))
    }

    /// Create a client with a custom HTTP client
    pub fn with_http_client(config: PlatformConfig, http: Client) -> Self {
        let mut base_url = config.endpoint;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self {
            base_url,
            api_version: config.api_version,
            http,
            auth: config.auth,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a URL for a path relative to the project endpoint
    fn endpoint(&self, path: &str) -> PlatformResult<Url> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| PlatformError::protocol(format!("Invalid endpoint path: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    /// Apply authentication to a request builder
    fn apply_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(AuthConfig::Bearer(token)) => builder.bearer_auth(token),
            Some(AuthConfig::ApiKeyHeader { name, value }) => builder.header(name.as_str(), value),
            None => builder,
        }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.apply_auth(self.http.request(method, url))
    }

    /// Send a request and check the status, returning the raw response
    async fn send(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> PlatformResult<reqwest::Response> {
        let response = builder.send().await.map_err(|e| {
            PlatformError::transport(format!("Failed to {}: {}", operation, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_error_response(status, response).await);
        }
        Ok(response)
    }

    /// Send a request and parse the JSON body
    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> PlatformResult<T> {
        let response = self.send(operation, builder).await?;
        response.json::<T>().await.map_err(|e| {
            if e.is_decode() {
                PlatformError::protocol(format!("Failed to parse {} response: {}", operation, e))
            } else {
                PlatformError::transport(format!("Failed to read {} response: {}", operation, e))
            }
        })
    }

    async fn list_message_page(
        &self,
        thread_id: &ThreadId,
        after: Option<&str>,
    ) -> PlatformResult<ListObject<MessageObject>> {
        let mut url = self.endpoint(&format!("threads/{}/messages", thread_id))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("order", "asc");
            query.append_pair("limit", MESSAGE_PAGE_SIZE);
            if let Some(after) = after {
                query.append_pair("after", after);
            }
        }
        self.send_json("list messages", self.request(Method::GET, url))
            .await
    }
}

/// Map an unsuccessful response to a [`PlatformError`]
async fn handle_error_response(status: StatusCode, response: reqwest::Response) -> PlatformError {
    let resource = response.url().path().to_string();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let error_text = response.text().await.unwrap_or_default();

    match status {
        StatusCode::BAD_REQUEST => PlatformError::invalid_request(error_text),
        StatusCode::UNAUTHORIZED => PlatformError::AuthenticationRequired,
        StatusCode::FORBIDDEN => PlatformError::NotAuthorized { reason: error_text },
        StatusCode::NOT_FOUND => PlatformError::not_found(resource),
        StatusCode::CONFLICT => PlatformError::conflict(error_text),
        StatusCode::TOO_MANY_REQUESTS => PlatformError::RateLimited { retry_after },
        s if s.is_server_error() => PlatformError::Unavailable {
            status: s.as_u16(),
            message: error_text,
        },
        _ => PlatformError::protocol(format!("HTTP {}: {}", status, error_text)),
    }
}

#[async_trait]
impl AgentPlatform for HttpPlatformClient {
    async fn create_agent(&self, spec: &AgentSpec) -> PlatformResult<Agent> {
        let url = self.endpoint("assistants")?;
        let body = CreateAgentRequest::from(spec);

        debug!(name = %spec.name, tools = spec.tools.len(), "Creating agent");

        let agent: AgentObject = self
            .send_json("create agent", self.request(Method::POST, url).json(&body))
            .await?;
        let agent = Agent::from(agent);

        info!(agent_id = %agent.id, name = %agent.name, "Created agent");
        Ok(agent)
    }

    async fn delete_agent(&self, agent_id: &AgentId) -> PlatformResult<()> {
        let url = self.endpoint(&format!("assistants/{}", agent_id))?;
        self.send("delete agent", self.request(Method::DELETE, url))
            .await?;
        info!(agent_id = %agent_id, "Deleted agent");
        Ok(())
    }

    async fn create_thread(&self) -> PlatformResult<ThreadId> {
        let url = self.endpoint("threads")?;
        let thread: ThreadObject = self
            .send_json(
                "create thread",
                self.request(Method::POST, url).json(&serde_json::json!({})),
            )
            .await?;
        info!(thread_id = %thread.id, "Created thread");
        Ok(thread.id)
    }

    async fn delete_thread(&self, thread_id: &ThreadId) -> PlatformResult<()> {
        let url = self.endpoint(&format!("threads/{}", thread_id))?;
        self.send("delete thread", self.request(Method::DELETE, url))
            .await?;
        info!(thread_id = %thread_id, "Deleted thread");
        Ok(())
    }

    async fn create_message(
        &self,
        thread_id: &ThreadId,
        role: Role,
        content: &str,
    ) -> PlatformResult<ThreadMessage> {
        let url = self.endpoint(&format!("threads/{}/messages", thread_id))?;
        let body = CreateMessageRequest { role, content };

        let message: MessageObject = self
            .send_json("create message", self.request(Method::POST, url).json(&body))
            .await?;

        debug!(thread_id = %thread_id, message_id = %message.id, role = %role, "Created message");
        Ok(message.into())
    }

    async fn list_messages(&self, thread_id: &ThreadId) -> PlatformResult<Vec<ThreadMessage>> {
        let mut messages = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let page = self.list_message_page(thread_id, after.as_deref()).await?;
            let count = page.data.len();
            messages.extend(page.data.into_iter().map(ThreadMessage::from));

            match page.last_id {
                Some(last_id) if page.has_more && count > 0 => after = Some(last_id),
                _ => break,
            }
        }

        debug!(thread_id = %thread_id, count = messages.len(), "Listed messages");
        Ok(messages)
    }

    async fn create_run(&self, thread_id: &ThreadId, agent_id: &AgentId) -> PlatformResult<Run> {
        let url = self.endpoint(&format!("threads/{}/runs", thread_id))?;
        let body = CreateRunRequest {
            assistant_id: agent_id,
        };

        let run: RunObject = self
            .send_json("create run", self.request(Method::POST, url).json(&body))
            .await?;

        debug!(thread_id = %thread_id, run_id = %run.id, status = %run.status, "Created run");
        Ok(run.into())
    }

    async fn get_run(&self, thread_id: &ThreadId, run_id: &RunId) -> PlatformResult<Run> {
        let url = self.endpoint(&format!("threads/{}/runs/{}", thread_id, run_id))?;
        let run: RunObject = self
            .send_json("get run", self.request(Method::GET, url))
            .await?;
        Ok(run.into())
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &ThreadId,
        run_id: &RunId,
        outputs: &[ToolOutput],
    ) -> PlatformResult<Run> {
        let url = self.endpoint(&format!(
            "threads/{}/runs/{}/submit_tool_outputs",
            thread_id, run_id
        ))?;
        let body = SubmitToolOutputsRequest {
            tool_outputs: outputs,
        };

        debug!(run_id = %run_id, outputs = outputs.len(), "Submitting tool outputs");

        let run: RunObject = self
            .send_json(
                "submit tool outputs",
                self.request(Method::POST, url).json(&body),
            )
            .await?;
        Ok(run.into())
    }

    async fn cancel_run(&self, thread_id: &ThreadId, run_id: &RunId) -> PlatformResult<Run> {
        let url = self.endpoint(&format!("threads/{}/runs/{}/cancel", thread_id, run_id))?;
        let run: RunObject = self
            .send_json("cancel run", self.request(Method::POST, url))
            .await?;
        info!(run_id = %run_id, status = %run.status, "Requested run cancellation");
        Ok(run.into())
    }
}
