//! # Launcher
//!
//! Runs several named HTTP servers side by side until shutdown. A server
//! that fails to bind or stops with an error is logged; the others keep
//! running.

use crate::error::ServerError;
use axum::Router;
use runbridge_core::ConfigError;
use runbridge_core::env::{get_env_string, get_env_u16};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Bind addresses for the launched servers, from the environment.
///
/// A server is launched only when its port variable is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub host: String,
    pub weather_port: Option<u16>,
    pub title_agent_port: Option<u16>,
    pub outline_agent_port: Option<u16>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            weather_port: None,
            title_agent_port: None,
            outline_agent_port: None,
        }
    }
}

impl LaunchConfig {
    /// Read `RUNBRIDGE_SERVER_HOST` and the `RUNBRIDGE_*_PORT` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            host: get_env_string("RUNBRIDGE_SERVER_HOST").unwrap_or_else(|| DEFAULT_HOST.into()),
            weather_port: get_env_u16("RUNBRIDGE_WEATHER_TOOL_PORT")?,
            title_agent_port: get_env_u16("RUNBRIDGE_TITLE_AGENT_PORT")?,
            outline_agent_port: get_env_u16("RUNBRIDGE_OUTLINE_AGENT_PORT")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server host must not be empty".into(),
            ));
        }
        if self.weather_port.is_none()
            && self.title_agent_port.is_none()
            && self.outline_agent_port.is_none()
        {
            return Err(ConfigError::ValidationError(
                "no server port configured; set RUNBRIDGE_WEATHER_TOOL_PORT, RUNBRIDGE_TITLE_AGENT_PORT or RUNBRIDGE_OUTLINE_AGENT_PORT".into(),
            ));
        }
        Ok(())
    }

    /// `host:port`
    pub fn addr(&self, port: u16) -> String {
        format!("{}:{}", self.host, port)
    }
}

/// One server to launch
pub struct NamedServer {
    pub name: String,
    pub addr: String,
    pub router: Router,
}

impl NamedServer {
    pub fn new(name: impl Into<String>, addr: impl Into<String>, router: Router) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
            router,
        }
    }
}

/// Bind and serve one router until `shutdown` fires
pub async fn serve(
    name: &str,
    addr: &str,
    router: Router,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            name: name.to_string(),
            addr: addr.to_string(),
            source,
        })?;

    let local = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| addr.to_string());
    info!(server = %name, address = %local, "Server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|source| ServerError::Serve {
            name: name.to_string(),
            source,
        })?;

    info!(server = %name, "Server stopped");
    Ok(())
}

/// Run every server concurrently until all of them have stopped.
///
/// Returns the servers that failed, by name.
pub async fn launch(
    servers: Vec<NamedServer>,
    shutdown: CancellationToken,
) -> Vec<(String, ServerError)> {
    let mut tasks = JoinSet::new();
    for server in servers {
        let token = shutdown.clone();
        tasks.spawn(async move {
            let result = serve(&server.name, &server.addr, server.router, token).await;
            (server.name, result)
        });
    }

    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(()))) => {}
            Ok((name, Err(e))) => {
                error!(server = %name, error = %e, "Server failed");
                failures.push((name, e));
            }
            Err(e) => error!(error = %e, "Server task aborted"),
        }
    }
    failures
}

/// Cancel `token` on Ctrl+C
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down");
                token.cancel();
            }
            Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
        }
    });
}
