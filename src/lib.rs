//! # Runbridge
//!
//! Runbridge drives runs of hosted agents through their tool-call cycle.
//! A caller posts a message to a conversation thread, starts a run, and the
//! [`RunDriver`] polls it, executes the tools the agent asks for locally,
//! submits their outputs and returns the agent's reply.
//!
//! ## Core Components
//!
//! - **[`AgentPlatform`]**: the hosted service (agents, threads, messages, runs)
//! - **[`HttpPlatformClient`]**: REST implementation of the platform
//! - **[`Tool`] / [`ToolRegistry`]**: local functions the agent may call
//! - **[`RunDriver`]**: the polling and dispatch loop
//! - **[`WorkflowSession`]**: scoped creation and cleanup of agents and threads
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use runbridge::{
//!     AgentSpec, FunctionTool, ExecutionResult, HttpPlatformClient, InMemoryToolRegistry,
//!     PlatformConfig, RunDriver, TurnContext, WorkflowSession,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let platform = Arc::new(HttpPlatformClient::new(PlatformConfig::from_env()?)?);
//! let weather = FunctionTool::new("get_weather", "Current weather", |args| {
//!     ExecutionResult::success(format!("22C, clear in {}", args["location"]))
//! });
//! let tools = Arc::new(InMemoryToolRegistry::new().with_tool(Arc::new(weather)));
//! let driver = RunDriver::new(platform, tools);
//!
//! let mut session = WorkflowSession::for_driver(&driver);
//! let agent = session
//!     .create_agent(&AgentSpec::new("weather", "gpt-4o", "Answer with the weather")
//!         .with_tools(driver.tools().definitions()))
//!     .await?;
//! let thread = session.create_thread().await?;
//!
//! let outcome = driver
//!     .run_turn(&TurnContext::new(thread, agent.id), "What's the weather in Paris?")
//!     .await;
//! session.close().await;
//! println!("{}", outcome?.text);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Module aliases for namespaced access
// ============================================================================

pub use runbridge_core as core;
pub use runbridge_driver as driver;
pub use runbridge_platform as platform;
pub use runbridge_server as server;
pub use runbridge_tools as tools;

// ============================================================================
// Domain model
// ============================================================================

pub use runbridge_core::{
    Agent, AgentPlatform, AgentSpec, ContentPart, RequiredAction, Role, Run, RunLastError,
    RunStatus, ThreadMessage, ToolCallRequest, ToolDefinition, ToolOutput,
};

// Identifiers
pub use runbridge_core::{AgentId, IdValidationError, MessageId, RunId, ThreadId, ToolCallId};

// Errors
pub use runbridge_core::{ConfigError, PlatformError, PlatformResult, ToolError};

// ============================================================================
// Tools
// ============================================================================

pub use runbridge_core::{ExecutionResult, Tool};
pub use runbridge_tools::{FunctionTool, InMemoryToolRegistry, ToolRegistry};
pub use runbridge_tools::{FETCH_WEATHER, FetchWeatherTool, WeatherToolConfig};

// ============================================================================
// Platform client
// ============================================================================

pub use runbridge_platform::{AuthConfig, HttpPlatformClient, PlatformConfig};

// ============================================================================
// Run driver
// ============================================================================

pub use runbridge_driver::{
    CancellationToken, CleanupReport, DriverConfig, MessageScope, MessageSelection, PollPolicy,
    RetryPolicy, RunDriver, RunError, ToolFailureMode, ToolInvocation, TurnContext, TurnOutcome,
    WorkflowSession,
};

// ============================================================================
// Servers
// ============================================================================

pub use runbridge_server::{
    AgentRelay, LaunchConfig, OpenWeatherProvider, ServerError, WeatherProvider, weather_router,
};
