//! Run lifecycle types
//!
//! A [`Run`] is one execution of an agent against a thread. Its status moves
//! forward only:
//!
//! ```text
//! queued -> in_progress -> (requires_action -> in_progress)* -> completed | failed
//! ```
//!
//! The platform can also end a run as `cancelled`, `expired` or `incomplete`,
//! and reports `cancelling` while a cancellation is in flight.

use crate::identifiers::{AgentId, RunId, ThreadId, ToolCallId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a run as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
    Expired,
    Incomplete,
}

impl RunStatus {
    /// Status string as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
            RunStatus::Incomplete => "incomplete",
        }
    }

    /// Whether the run is still being worked on and must be polled again
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            RunStatus::Queued
                | RunStatus::InProgress
                | RunStatus::RequiresAction
                | RunStatus::Cancelling
        )
    }

    /// Whether the run has reached a final state
    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    /// Ordering rank used to check forward-only movement.
    ///
    /// `requires_action` and `in_progress` share a rank because a run
    /// alternates between them while tool outputs are exchanged.
    fn rank(&self) -> u8 {
        match self {
            RunStatus::Queued => 0,
            RunStatus::InProgress | RunStatus::RequiresAction => 1,
            RunStatus::Cancelling => 2,
            RunStatus::Completed
            | RunStatus::Failed
            | RunStatus::Cancelled
            | RunStatus::Expired
            | RunStatus::Incomplete => 3,
        }
    }

    /// Check whether moving from `self` to `next` respects the run lifecycle
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        if self.is_terminal() {
            return *self == next;
        }
        next.rank() >= self.rank()
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single function call requested by the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlation id for the output
    pub id: ToolCallId,
    /// Name of the function to invoke
    pub name: String,
    /// Serialized JSON arguments
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(
        id: ToolCallId,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Output of one tool call, submitted back to resume the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: ToolCallId,
    pub output: String,
}

impl ToolOutput {
    pub fn new(tool_call_id: ToolCallId, output: impl Into<String>) -> Self {
        Self {
            tool_call_id,
            output: output.into(),
        }
    }
}

/// Action the platform is waiting for before the run can continue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequiredAction {
    SubmitToolOutputs { tool_calls: Vec<ToolCallRequest> },
}

impl RequiredAction {
    /// The tool calls that need an output
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            RequiredAction::SubmitToolOutputs { tool_calls } => tool_calls,
        }
    }
}

/// Error details attached to a failed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLastError {
    pub code: String,
    pub message: String,
}

/// Snapshot of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub thread_id: ThreadId,
    pub agent_id: AgentId,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_action: Option<RequiredAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<RunLastError>,
}

impl Run {
    /// Tool calls pending on this run, empty unless `requires_action`
    pub fn pending_tool_calls(&self) -> &[ToolCallRequest] {
        match (&self.status, &self.required_action) {
            (RunStatus::RequiresAction, Some(action)) => action.tool_calls(),
            _ => &[],
        }
    }
}
