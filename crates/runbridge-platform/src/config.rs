//! # Platform Configuration
//!
//! ## Environment Variables
//!
//! - `RUNBRIDGE_PROJECT_ENDPOINT` - Base URL of the platform project (required)
//! - `RUNBRIDGE_API_VERSION` - `api-version` query value (default: 2025-05-01)
//! - `RUNBRIDGE_BEARER_TOKEN` - Static bearer token
//! - `RUNBRIDGE_API_KEY` - API key sent in the `api-key` header, used when no bearer token is set
//! - `RUNBRIDGE_REQUEST_TIMEOUT_SECS` - Per-request timeout in seconds (default: 30)

use runbridge_core::env::{get_env_string, get_env_u64, require_env_string};
use runbridge_core::ConfigError;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_VERSION: &str = "2025-05-01";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const API_KEY_HEADER: &str = "api-key";

/// Authentication attached to every platform request
#[derive(Clone)]
pub enum AuthConfig {
    /// Bearer token authentication
    Bearer(String),
    /// API key in header
    ApiKeyHeader { name: String, value: String },
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthConfig::Bearer(_) => f.write_str("Bearer(***)"),
            AuthConfig::ApiKeyHeader { name, .. } => f
                .debug_struct("ApiKeyHeader")
                .field("name", name)
                .field("value", &"***")
                .finish(),
        }
    }
}

/// Connection settings for [`HttpPlatformClient`](crate::HttpPlatformClient)
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub endpoint: Url,
    pub api_version: String,
    pub auth: Option<AuthConfig>,
    pub request_timeout: Duration,
}

impl PlatformConfig {
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint.as_ref())
            .map_err(|e| ConfigError::ValidationError(format!("invalid endpoint URL: {}", e)))?;
        Ok(Self {
            endpoint,
            api_version: DEFAULT_API_VERSION.to_string(),
            auth: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_bearer_token(self, token: impl Into<String>) -> Self {
        self.with_auth(AuthConfig::Bearer(token.into()))
    }

    pub fn with_api_key(self, api_key: impl Into<String>) -> Self {
        self.with_auth(AuthConfig::ApiKeyHeader {
            name: API_KEY_HEADER.to_string(),
            value: api_key.into(),
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new(require_env_string("RUNBRIDGE_PROJECT_ENDPOINT")?)?;

        if let Some(version) = get_env_string("RUNBRIDGE_API_VERSION") {
            config = config.with_api_version(version);
        }

        if let Some(token) = get_env_string("RUNBRIDGE_BEARER_TOKEN") {
            config = config.with_bearer_token(token);
        } else if let Some(key) = get_env_string("RUNBRIDGE_API_KEY") {
            config = config.with_api_key(key);
        }

        if let Some(secs) = get_env_u64("RUNBRIDGE_REQUEST_TIMEOUT_SECS")? {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "endpoint must be http or https, got '{}'",
                self.endpoint.scheme()
            )));
        }
        if self.api_version.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "api_version must not be empty".into(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "request_timeout must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
