//! # Runbridge Tools
//!
//! Local tools that satisfy the tool calls hosted agents emit during a run.
//!
//! - **Registry**: [`ToolRegistry`] and [`InMemoryToolRegistry`], the name → handler seam
//! - **Function tools**: [`FunctionTool`] wraps a closure as a tool
//! - **Weather** (`weather`): [`FetchWeatherTool`] calls the local weather tool server

/// Closure-backed tools.
pub mod function;
/// Tool registry implementations for managing collections of tools.
pub mod registry;
/// Weather lookup through the weather tool server.
#[cfg(feature = "weather")]
pub mod weather;

pub use function::FunctionTool;
pub use registry::{InMemoryToolRegistry, ToolRegistry};
pub use runbridge_core::{ExecutionResult, Tool, ToolCallRequest, ToolDefinition, ToolError};
#[cfg(feature = "weather")]
pub use weather::{FETCH_WEATHER, FetchWeatherTool, WeatherToolConfig};
