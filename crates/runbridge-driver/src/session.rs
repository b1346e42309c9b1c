//! Workflow-scoped platform resources
//!
//! A [`WorkflowSession`] remembers every agent and thread it creates and
//! deletes them in [`WorkflowSession::close`], whatever the workflow's
//! outcome.

use crate::driver::RunDriver;
use crate::error::RunError;
use crate::policy::RetryPolicy;
use crate::retry::with_retry;
use runbridge_core::{Agent, AgentId, AgentPlatform, AgentSpec, PlatformError, ThreadId};
use runbridge_tools::ToolRegistry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Outcome of [`WorkflowSession::close`]
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub deleted_agents: Vec<AgentId>,
    pub deleted_threads: Vec<ThreadId>,
    /// Resources that could not be deleted
    pub failures: Vec<(String, PlatformError)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Agents and threads created for one workflow invocation
pub struct WorkflowSession {
    platform: Arc<dyn AgentPlatform>,
    tools: Arc<dyn ToolRegistry>,
    retry: RetryPolicy,
    agents: Vec<AgentId>,
    threads: Vec<ThreadId>,
}

impl WorkflowSession {
    pub fn new(platform: Arc<dyn AgentPlatform>, tools: Arc<dyn ToolRegistry>) -> Self {
        Self {
            platform,
            tools,
            retry: RetryPolicy::default(),
            agents: Vec::new(),
            threads: Vec::new(),
        }
    }

    /// Session sharing the driver's platform, tools and retry policy
    pub fn for_driver(driver: &RunDriver) -> Self {
        let mut session = Self::new(Arc::clone(driver.platform()), Arc::clone(driver.tools()));
        session.retry = driver.config().retry.clone();
        session
    }

    /// Create an agent owned by this session.
    ///
    /// Tool-enabled agents are only created when every advertised tool has a
    /// registered handler.
    pub async fn create_agent(&mut self, spec: &AgentSpec) -> Result<Agent, RunError> {
        if spec.has_tools() {
            self.tools
                .ensure_covers(&spec.tools)
                .map_err(RunError::ToolSetup)?;
        }

        let platform = &self.platform;
        let agent = with_retry(&self.retry, "create agent", &CancellationToken::new(), || {
            platform.create_agent(spec)
        })
        .await?;

        self.agents.push(agent.id.clone());
        Ok(agent)
    }

    /// Create a thread owned by this session
    pub async fn create_thread(&mut self) -> Result<ThreadId, RunError> {
        let platform = &self.platform;
        let thread_id = with_retry(&self.retry, "create thread", &CancellationToken::new(), || {
            platform.create_thread()
        })
        .await?;

        self.threads.push(thread_id.clone());
        Ok(thread_id)
    }

    pub fn agents(&self) -> &[AgentId] {
        &self.agents
    }

    pub fn threads(&self) -> &[ThreadId] {
        &self.threads
    }

    /// Delete every agent and thread of the session.
    ///
    /// Deletion continues past failures; they are logged and reported.
    pub async fn close(mut self) -> CleanupReport {
        let mut report = CleanupReport::default();

        for agent_id in std::mem::take(&mut self.agents) {
            match self.platform.delete_agent(&agent_id).await {
                Ok(()) => report.deleted_agents.push(agent_id),
                Err(error) => {
                    warn!(agent_id = %agent_id, error = %error, "Failed to delete agent");
                    report.failures.push((format!("agent {}", agent_id), error));
                }
            }
        }

        for thread_id in std::mem::take(&mut self.threads) {
            match self.platform.delete_thread(&thread_id).await {
                Ok(()) => report.deleted_threads.push(thread_id),
                Err(error) => {
                    warn!(thread_id = %thread_id, error = %error, "Failed to delete thread");
                    report.failures.push((format!("thread {}", thread_id), error));
                }
            }
        }

        info!(
            agents = report.deleted_agents.len(),
            threads = report.deleted_threads.len(),
            failures = report.failures.len(),
            "Workflow resources cleaned up"
        );
        report
    }
}

impl Drop for WorkflowSession {
    fn drop(&mut self) {
        if !self.agents.is_empty() || !self.threads.is_empty() {
            warn!(
                agents = self.agents.len(),
                threads = self.threads.len(),
                "Workflow session dropped without close; platform resources leak"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runbridge_core::{ToolDefinition, ToolError};
    use runbridge_testing::{MockTool, Operation, ScriptedPlatform};
    use runbridge_tools::InMemoryToolRegistry;
    use serde_json::json;

    fn tools() -> Arc<dyn ToolRegistry> {
        Arc::new(InMemoryToolRegistry::new().with_tool(Arc::new(MockTool::new("fetch_weather"))))
    }

    #[tokio::test]
    async fn close_deletes_everything_it_created() {
        let platform = Arc::new(ScriptedPlatform::new());
        let mut session = WorkflowSession::new(platform.clone(), tools());

        let agent = session
            .create_agent(&AgentSpec::new("planner", "gpt-4o", "Plan trips"))
            .await
            .unwrap();
        let thread = session.create_thread().await.unwrap();

        let report = session.close().await;
        assert!(report.is_clean());
        assert_eq!(platform.deleted_agents(), vec![agent.id]);
        assert_eq!(platform.deleted_threads(), vec![thread]);
        assert_eq!(platform.live_thread_count(), 0);
    }

    #[tokio::test]
    async fn close_continues_past_failures() {
        let platform = Arc::new(ScriptedPlatform::new());
        let mut session = WorkflowSession::new(platform.clone(), tools());
        session
            .create_agent(&AgentSpec::new("a", "m", "i"))
            .await
            .unwrap();
        session.create_thread().await.unwrap();

        platform.fail_next(Operation::DeleteAgent, PlatformError::Unavailable {
            status: 500,
            message: "oops".into(),
        });

        let report = session.close().await;
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.deleted_threads.len(), 1);
    }

    #[tokio::test]
    async fn tool_enabled_agent_requires_handlers() {
        let platform = Arc::new(ScriptedPlatform::new());
        let mut session = WorkflowSession::new(platform.clone(), tools());

        let spec = AgentSpec::new("weather", "gpt-4o", "Use tools")
            .with_tool(ToolDefinition::new("fetch_weather", "", json!({})))
            .with_tool(ToolDefinition::new("book_hotel", "", json!({})));

        let err = session.create_agent(&spec).await.unwrap_err();
        assert!(matches!(
            err,
            RunError::ToolSetup(ToolError::MissingHandlers { ref names }) if names == &vec!["book_hotel".to_string()]
        ));
        assert_eq!(platform.call_count(Operation::CreateAgent), 0);

        session.close().await;
    }
}
