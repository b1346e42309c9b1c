//! # Runbridge Platform
//!
//! HTTP client for assistants-style hosted agent platforms.
//!
//! ```rust,ignore
//! use runbridge_platform::{HttpPlatformClient, PlatformConfig};
//!
//! let client = HttpPlatformClient::new(PlatformConfig::from_env()?)?;
//! let thread_id = client.create_thread().await?;
//! ```

pub mod client;
pub mod config;
pub mod wire;

pub use client::HttpPlatformClient;
pub use config::{AuthConfig, PlatformConfig};
