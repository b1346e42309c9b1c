//! Errors returned by a turn

use runbridge_core::{PlatformError, RunId, RunStatus, ToolCallId, ToolError};
use std::time::Duration;
use thiserror::Error;

/// Why a turn did not produce an assistant reply
#[derive(Debug, Error)]
pub enum RunError {
    /// The user message was empty or whitespace only
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The agent asked for a function with no registered handler
    #[error("Run {run_id} requested unknown tool '{name}' (call {tool_call_id})")]
    UnknownTool {
        run_id: RunId,
        tool_call_id: ToolCallId,
        name: String,
    },

    /// A tool call failed and the driver is configured to abort
    #[error("Tool execution failed in run {run_id}: {source}")]
    ToolExecution {
        run_id: RunId,
        #[source]
        source: ToolError,
    },

    /// Tools advertised to an agent are not all backed by handlers
    #[error("Tool setup failed: {0}")]
    ToolSetup(#[source] ToolError),

    /// The run completed but left no assistant message in scope
    #[error("Run {run_id} completed without an assistant reply")]
    NoAssistantReply { run_id: RunId },

    /// The run reached `failed`
    #[error("Run {run_id} failed: {code}: {message}")]
    RunFailed {
        run_id: RunId,
        code: String,
        message: String,
    },

    /// The run reached a terminal status other than `completed` or `failed`
    #[error("Run {run_id} ended with status {status}")]
    RunEnded { run_id: RunId, status: RunStatus },

    /// The run exceeded its poll or wall-clock budget
    #[error("Run {run_id} did not finish after {polls} polls ({elapsed:?})")]
    Timeout {
        run_id: RunId,
        polls: u32,
        elapsed: Duration,
    },

    /// The caller cancelled the turn
    #[error("Turn cancelled{}", .run_id.as_ref().map(|id| format!(" (run {})", id)).unwrap_or_default())]
    Cancelled { run_id: Option<RunId> },

    /// Retryable platform failures persisted past the retry budget
    #[error("Platform unavailable during {operation} after {attempts} attempts: {source}")]
    PlatformUnavailable {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: PlatformError,
    },

    /// Non-retryable platform error
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl RunError {
    /// Run the error belongs to, when one was started
    pub fn run_id(&self) -> Option<&RunId> {
        match self {
            RunError::UnknownTool { run_id, .. }
            | RunError::ToolExecution { run_id, .. }
            | RunError::NoAssistantReply { run_id }
            | RunError::RunFailed { run_id, .. }
            | RunError::RunEnded { run_id, .. }
            | RunError::Timeout { run_id, .. } => Some(run_id),
            RunError::Cancelled { run_id } => run_id.as_ref(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RunError::Timeout { .. })
    }

    /// Whether the hosted platform, not the agent or the caller, is at fault
    pub fn is_platform(&self) -> bool {
        matches!(
            self,
            RunError::Platform(_) | RunError::PlatformUnavailable { .. }
        )
    }
}
