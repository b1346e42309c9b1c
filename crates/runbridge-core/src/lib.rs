//! # Runbridge Core
//!
//! Core types and traits for driving hosted agent runs:
//!
//! - **Identifiers**: validated ids for agents, threads, runs, messages and tool calls
//! - **Runs**: run status lifecycle, pending tool calls and tool outputs
//! - **Messages**: thread messages and their content parts
//! - **Tools**: the synchronous [`Tool`] trait and [`ExecutionResult`]
//! - **Platform**: the [`AgentPlatform`] trait the driver talks to
//! - **Errors**: [`PlatformError`] and [`ToolError`]

pub mod agent;
pub mod env;
pub mod error;
pub mod identifiers;
pub mod message;
pub mod platform;
pub mod run;
pub mod tool;

pub use agent::{Agent, AgentSpec, ToolDefinition};
pub use env::ConfigError;
pub use error::{PlatformError, PlatformResult, ToolError};
pub use identifiers::{AgentId, IdValidationError, MessageId, RunId, ThreadId, ToolCallId};
pub use message::{ContentPart, Role, ThreadMessage};
pub use platform::AgentPlatform;
pub use run::{RequiredAction, Run, RunLastError, RunStatus, ToolCallRequest, ToolOutput};
pub use tool::{ExecutionResult, Tool};
