use crate::trip::TripError;
use runbridge::{ConfigError, IdValidationError, PlatformError, RunError, ServerError};
use thiserror::Error;

/// Errors surfaced by CLI commands
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Trip(#[from] TripError),

    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] IdValidationError),
}
