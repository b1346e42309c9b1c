//! # Agent Relay
//!
//! Exposes one hosted agent over HTTP. Each `POST /turn` runs a single turn
//! through the [`RunDriver`] on the caller's thread, or on a fresh thread
//! when none is given.
//!
//! The relay owns its agent and every thread it creates; [`AgentRelay::close`]
//! deletes them once the server has stopped.
//!
//! A turn runs in its own task. When the client goes away before the reply,
//! the turn's token is cancelled and the driver cancels the hosted run, so
//! the thread is free for the next turn.

use crate::error::ApiError;
use crate::weather::health;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use runbridge_core::{AgentId, AgentSpec, ThreadId};
use runbridge_driver::{CleanupReport, RunDriver, RunError, TurnContext, WorkflowSession};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Body of `POST /turn`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Answer of `POST /turn`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub thread_id: String,
    pub run_id: String,
    pub output: String,
}

/// HTTP front for one hosted agent
#[derive(Clone)]
pub struct AgentRelay {
    name: Arc<str>,
    driver: RunDriver,
    agent_id: AgentId,
    session: Arc<Mutex<Option<WorkflowSession>>>,
    /// Serialises turns per thread; the platform allows one active run each.
    /// Entries live only while a turn holds or waits for them.
    thread_locks: Arc<Mutex<HashMap<ThreadId, Arc<Mutex<()>>>>>,
}

impl std::fmt::Debug for AgentRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRelay")
            .field("name", &self.name)
            .field("agent_id", &self.agent_id)
            .finish_non_exhaustive()
    }
}

impl AgentRelay {
    /// Create the relay's agent on the platform
    pub async fn start(
        name: impl Into<String>,
        driver: RunDriver,
        spec: &AgentSpec,
    ) -> Result<Self, RunError> {
        let name: Arc<str> = Arc::from(name.into());
        let mut session = WorkflowSession::for_driver(&driver);
        let agent = session.create_agent(spec).await?;
        info!(relay = %name, agent_id = %agent.id, "Relay agent created");

        Ok(Self {
            name,
            driver,
            agent_id: agent.id,
            session: Arc::new(Mutex::new(Some(session))),
            thread_locks: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/turn", post(turn))
            .route("/health", get(health))
            .with_state(self.clone())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Delete the agent and the threads created by the relay.
    ///
    /// Later turns are rejected.
    pub async fn close(&self) -> CleanupReport {
        match self.session.lock().await.take() {
            Some(session) => session.close().await,
            None => CleanupReport::default(),
        }
    }

    async fn create_thread(&self) -> Result<ThreadId, ApiError> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or_else(shutting_down)?;
        session.create_thread().await.map_err(|e| api_error(&e))
    }

    /// Threads with a turn running or waiting
    pub async fn tracked_thread_count(&self) -> usize {
        self.thread_locks.lock().await.len()
    }

    async fn thread_lock(&self, thread_id: &ThreadId) -> Arc<Mutex<()>> {
        let mut locks = self.thread_locks.lock().await;
        Arc::clone(locks.entry(thread_id.clone()).or_default())
    }

    /// Forget the thread's lock unless another turn holds a copy
    async fn release_thread_lock(&self, thread_id: &ThreadId, lock: Arc<Mutex<()>>) {
        let mut locks = self.thread_locks.lock().await;
        // The map's copy plus ours
        if Arc::strong_count(&lock) == 2 {
            locks.remove(thread_id);
        }
    }

    async fn run_turn(
        &self,
        request: TurnRequest,
        cancel: CancellationToken,
    ) -> Result<TurnResponse, ApiError> {
        if self.session.lock().await.is_none() {
            return Err(shutting_down());
        }
        if request.message.trim().is_empty() {
            return Err(ApiError::bad_request("message must not be empty"));
        }

        let thread_id = match request.thread_id {
            Some(raw) => ThreadId::parse(&raw)
                .map_err(|e| ApiError::bad_request(format!("invalid thread_id: {}", e)))?,
            None => self.create_thread().await?,
        };

        let ctx = TurnContext::new(thread_id.clone(), self.agent_id.clone());
        let lock = self.thread_lock(&thread_id).await;
        let result = {
            let _turn = lock.lock().await;
            self.driver
                .run_turn_with_cancel(&ctx, &request.message, cancel)
                .await
        };
        self.release_thread_lock(&thread_id, lock).await;

        let outcome = result.map_err(|e| {
            warn!(relay = %self.name, thread_id = %thread_id, error = %e, "Turn failed");
            api_error(&e)
        })?;

        Ok(TurnResponse {
            thread_id: thread_id.to_string(),
            run_id: outcome.run_id.to_string(),
            output: outcome.text,
        })
    }
}

fn shutting_down() -> ApiError {
    ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "relay is shutting down")
}

/// HTTP status for a failed turn
fn status_for(error: &RunError) -> StatusCode {
    match error {
        RunError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        RunError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        e if e.is_platform() => StatusCode::BAD_GATEWAY,
        RunError::RunFailed { .. } | RunError::RunEnded { .. } | RunError::NoAssistantReply { .. } => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(error: &RunError) -> ApiError {
    ApiError::new(status_for(error), error.to_string())
}

async fn turn(State(relay): State<AgentRelay>, body: Bytes) -> Result<Json<TurnResponse>, ApiError> {
    let request: TurnRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid request body: {}", e)))?;

    // Dropping this handler (client disconnect) cancels the turn
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let task = tokio::spawn(async move { relay.run_turn(request, cancel).await });
    match task.await {
        Ok(result) => result.map(Json),
        Err(e) => Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("turn task failed: {}", e),
        )),
    }
}
