//! # Error Types
//!
//! Errors shared across the workspace: failures talking to the hosted
//! platform and failures executing local tools.

use crate::identifiers::ToolCallId;
use std::time::Duration;
use thiserror::Error;

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors returned by an [`AgentPlatform`](crate::AgentPlatform) implementation
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    /// The request never produced a response (connect failure, timeout, reset)
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The platform answered with a server-side error
    #[error("Platform unavailable (HTTP {status}): {message}")]
    Unavailable { status: u16, message: String },

    /// Rate limit exceeded
    #[error("Rate limited{}", .retry_after.map(|d| format!(": retry after {}s", d.as_secs())).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },

    /// Authentication required or rejected
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Authenticated but not allowed
    #[error("Not authorized: {reason}")]
    NotAuthorized { reason: String },

    /// Agent, thread, run or message does not exist
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Request conflicts with the current state (e.g. outputs already submitted)
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Request was rejected as invalid
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Response could not be understood
    #[error("Protocol error: {message}")]
    Protocol { message: String },
}

impl PlatformError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlatformError::Transport { .. }
                | PlatformError::Unavailable { .. }
                | PlatformError::RateLimited { .. }
        )
    }

    /// Delay the platform asked for before retrying, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            PlatformError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Errors raised while turning a tool call into a tool output
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// No handler is registered under the requested name
    #[error("Unknown tool '{name}' requested by call {tool_call_id}")]
    UnknownTool {
        tool_call_id: ToolCallId,
        name: String,
    },

    /// The serialized arguments are not a JSON value
    #[error("Invalid arguments for tool '{name}': {reason}")]
    InvalidArguments { name: String, reason: String },

    /// The handler reported a failure or panicked
    #[error("Tool '{name}' failed: {reason}")]
    Failed { name: String, reason: String },

    /// Definitions advertised to an agent have no registered handler
    #[error("No handler registered for advertised tools: {}", .names.join(", "))]
    MissingHandlers { names: Vec<String> },
}

impl ToolError {
    /// JSON payload submitted as the tool output when a call cannot be satisfied
    pub fn to_output_payload(&self) -> String {
        serde_json::json!({ "error": self.to_string() }).to_string()
    }
}
