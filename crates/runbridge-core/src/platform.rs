//! The hosted agent platform as seen by the driver

use crate::agent::{Agent, AgentSpec};
use crate::error::PlatformResult;
use crate::identifiers::{AgentId, RunId, ThreadId};
use crate::message::{Role, ThreadMessage};
use crate::run::{Run, ToolOutput};
use async_trait::async_trait;

/// Operations the driver and workflows need from the hosted platform.
///
/// Implementations must be safe to share between concurrent workflows.
/// Callers keep at most one active run per thread.
#[async_trait]
pub trait AgentPlatform: Send + Sync {
    /// Create an agent bound to a model, instructions and tool definitions
    async fn create_agent(&self, spec: &AgentSpec) -> PlatformResult<Agent>;

    async fn delete_agent(&self, agent_id: &AgentId) -> PlatformResult<()>;

    async fn create_thread(&self) -> PlatformResult<ThreadId>;

    async fn delete_thread(&self, thread_id: &ThreadId) -> PlatformResult<()>;

    /// Append a message to the thread
    async fn create_message(
        &self,
        thread_id: &ThreadId,
        role: Role,
        content: &str,
    ) -> PlatformResult<ThreadMessage>;

    /// All messages of the thread in chronological order
    async fn list_messages(&self, thread_id: &ThreadId) -> PlatformResult<Vec<ThreadMessage>>;

    /// Start a run of `agent_id` against the thread
    async fn create_run(&self, thread_id: &ThreadId, agent_id: &AgentId) -> PlatformResult<Run>;

    async fn get_run(&self, thread_id: &ThreadId, run_id: &RunId) -> PlatformResult<Run>;

    /// Submit outputs for the pending tool calls in one batch
    async fn submit_tool_outputs(
        &self,
        thread_id: &ThreadId,
        run_id: &RunId,
        outputs: &[ToolOutput],
    ) -> PlatformResult<Run>;

    /// Ask the platform to stop a run
    async fn cancel_run(&self, thread_id: &ThreadId, run_id: &RunId) -> PlatformResult<Run>;
}
