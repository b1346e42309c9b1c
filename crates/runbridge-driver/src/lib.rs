//! # Runbridge Driver
//!
//! The run driver: turns one user message into one agent reply by driving a
//! hosted run through its tool-call cycle.
//!
//! ```rust,ignore
//! use runbridge_driver::{RunDriver, TurnContext};
//!
//! let driver = RunDriver::new(platform, tools);
//! let outcome = driver
//!     .run_turn(&TurnContext::new(thread_id, agent_id), "What's the weather in Paris?")
//!     .await?;
//! println!("{}", outcome.text);
//! ```

pub mod dispatch;
pub mod driver;
pub mod error;
pub mod policy;
pub mod retry;
pub mod session;

pub use dispatch::ToolInvocation;
pub use driver::{RunDriver, TurnContext, TurnOutcome, select_reply};
pub use error::RunError;
pub use policy::{
    DriverConfig, MessageScope, MessageSelection, PollPolicy, RetryPolicy, ToolFailureMode,
};
pub use session::{CleanupReport, WorkflowSession};
pub use tokio_util::sync::CancellationToken;
