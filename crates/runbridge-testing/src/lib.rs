//! # Runbridge Testing
//!
//! Test doubles for code built on runbridge:
//!
//! - [`ScriptedPlatform`]: an in-memory agent platform whose runs follow [`RunScript`]s,
//!   with per-operation failure injection and call recording
//! - [`MockTool`]: a tool with canned responses and call history

pub mod mock_tools;
pub mod platform;

pub use mock_tools::MockTool;
pub use platform::{Operation, Reply, RunScript, ScriptedPlatform, Step, tool_call};
