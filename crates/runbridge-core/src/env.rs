//! Environment variable helpers shared by the `from_env` configuration builders

use std::env;
use std::time::Duration;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable '{key}'")]
    MissingEnvVar { key: String },

    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidEnvVar {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Read a variable, treating empty values as unset
pub fn get_env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Read a variable that must be present
pub fn require_env_string(key: &str) -> Result<String, ConfigError> {
    get_env_string(key).ok_or_else(|| ConfigError::MissingEnvVar {
        key: key.to_string(),
    })
}

pub fn get_env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match get_env_string(key) {
        Some(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::invalid(
                key,
                format!("expected boolean, got '{}'", val),
            )),
        },
        None => Ok(None),
    }
}

pub fn get_env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match get_env_string(key) {
        Some(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::invalid(key, format!("expected integer: {}", e))),
        None => Ok(None),
    }
}

pub fn get_env_u32(key: &str) -> Result<Option<u32>, ConfigError> {
    match get_env_string(key) {
        Some(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::invalid(key, format!("expected integer: {}", e))),
        None => Ok(None),
    }
}

pub fn get_env_u16(key: &str) -> Result<Option<u16>, ConfigError> {
    match get_env_string(key) {
        Some(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::invalid(key, format!("expected port number: {}", e))),
        None => Ok(None),
    }
}

/// Read a humantime duration such as `1s`, `250ms` or `10m`
pub fn get_env_duration(key: &str) -> Result<Option<Duration>, ConfigError> {
    match get_env_string(key) {
        Some(val) => humantime::parse_duration(val.trim())
            .map(Some)
            .map_err(|e| ConfigError::invalid(key, format!("expected duration: {}", e))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable names; the process environment is shared.

    #[test]
    fn parses_durations() {
        unsafe { env::set_var("RUNBRIDGE_TEST_DURATION_OK", "250ms") };
        assert_eq!(
            get_env_duration("RUNBRIDGE_TEST_DURATION_OK").unwrap(),
            Some(Duration::from_millis(250))
        );

        unsafe { env::set_var("RUNBRIDGE_TEST_DURATION_BAD", "soon") };
        assert!(matches!(
            get_env_duration("RUNBRIDGE_TEST_DURATION_BAD"),
            Err(ConfigError::InvalidEnvVar { .. })
        ));
    }

    #[test]
    fn empty_values_count_as_unset() {
        unsafe { env::set_var("RUNBRIDGE_TEST_EMPTY", "  ") };
        assert_eq!(get_env_string("RUNBRIDGE_TEST_EMPTY"), None);
        assert!(matches!(
            require_env_string("RUNBRIDGE_TEST_EMPTY"),
            Err(ConfigError::MissingEnvVar { .. })
        ));
    }

    #[test]
    fn parses_bools_and_numbers() {
        unsafe {
            env::set_var("RUNBRIDGE_TEST_BOOL", "yes");
            env::set_var("RUNBRIDGE_TEST_NUM", "42");
            env::set_var("RUNBRIDGE_TEST_PORT", "70000");
        }
        assert_eq!(get_env_bool("RUNBRIDGE_TEST_BOOL").unwrap(), Some(true));
        assert_eq!(get_env_u64("RUNBRIDGE_TEST_NUM").unwrap(), Some(42));
        assert!(get_env_u16("RUNBRIDGE_TEST_PORT").is_err());
        assert_eq!(get_env_u32("RUNBRIDGE_TEST_MISSING_NUM").unwrap(), None);
    }
}
