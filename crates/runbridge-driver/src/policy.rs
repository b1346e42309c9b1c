//! # Driver Configuration
//!
//! Polling, retry, reply selection and tool-failure policies.
//!
//! ## Environment Variables
//!
//! - `RUNBRIDGE_POLL_INTERVAL` - First poll interval (default: 1s)
//! - `RUNBRIDGE_POLL_MAX_INTERVAL` - Poll interval ceiling (default: 5s)
//! - `RUNBRIDGE_POLL_MAX_POLLS` - Maximum polls per run (default: 300)
//! - `RUNBRIDGE_RUN_TIMEOUT` - Wall-clock budget per run (default: 10m)
//! - `RUNBRIDGE_RETRY_MAX_ATTEMPTS` - Attempts per platform call (default: 4)
//! - `RUNBRIDGE_MESSAGE_SELECTION` - `first` or `last` (default: last)
//! - `RUNBRIDGE_MESSAGE_SCOPE` - `turn` or `thread` (default: turn)
//! - `RUNBRIDGE_TOOL_FAILURE_MODE` - `report` or `abort` (default: report)
//!
//! Durations use humantime syntax (`250ms`, `2s`, `10m`).

use runbridge_core::env::{get_env_duration, get_env_string, get_env_u32};
use runbridge_core::{ConfigError, PlatformError};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How often and how long a run is polled
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    /// Growth factor applied after every poll
    pub multiplier: f64,
    pub max_interval: Duration,
    pub max_polls: u32,
    pub max_wall_clock: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            multiplier: 1.5,
            max_interval: Duration::from_secs(5),
            max_polls: 300,
            max_wall_clock: Duration::from_secs(600),
        }
    }
}

impl PollPolicy {
    /// Fixed interval, no growth
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial_interval: interval,
            multiplier: 1.0,
            max_interval: interval,
            ..Self::default()
        }
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    pub fn with_max_wall_clock(mut self, max_wall_clock: Duration) -> Self {
        self.max_wall_clock = max_wall_clock;
        self
    }

    /// Interval following `current`
    pub fn next_interval(&self, current: Duration) -> Duration {
        current.mul_f64(self.multiplier).min(self.max_interval)
    }
}

/// Backoff for retryable platform failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A single attempt
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Backoff after the `attempt`-th failure (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        self.initial_backoff
            .mul_f64(self.multiplier.powi(exponent))
            .min(self.max_backoff)
    }

    /// Delay before retrying `error`; a platform `retry_after` hint wins
    pub fn delay_for(&self, attempt: u32, error: &PlatformError) -> Duration {
        error.retry_after().unwrap_or_else(|| self.backoff(attempt))
    }
}

/// Which assistant message of the scope is returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageSelection {
    First,
    #[default]
    Last,
}

/// Which part of the thread is searched for the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageScope {
    /// Messages after this turn's user message
    #[default]
    Turn,
    /// The whole thread
    Thread,
}

/// What happens when a tool call cannot be satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolFailureMode {
    /// Submit `{"error": ...}` as the output and let the agent react
    #[default]
    Report,
    /// Stop the turn with `RunError::ToolExecution`
    Abort,
}

macro_rules! keyword_enum {
    ($ty:ident { $($text:literal => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!(
                        "expected one of {}, got '{}'",
                        [$($text),+].join(", "),
                        other
                    )),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($ty::$variant => f.write_str($text),)+
                }
            }
        }
    };
}

keyword_enum!(MessageSelection { "first" => First, "last" => Last });
keyword_enum!(MessageScope { "turn" => Turn, "thread" => Thread });
keyword_enum!(ToolFailureMode { "report" => Report, "abort" => Abort });

/// Complete driver configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DriverConfig {
    pub poll: PollPolicy,
    pub retry: RetryPolicy,
    pub selection: MessageSelection,
    pub scope: MessageScope,
    pub tool_failure: ToolFailureMode,
}

fn get_env_parsed<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr<Err = String>,
{
    match get_env_string(key) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|message| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message,
            }),
        None => Ok(None),
    }
}

impl DriverConfig {
    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_selection(mut self, selection: MessageSelection, scope: MessageScope) -> Self {
        self.selection = selection;
        self.scope = scope;
        self
    }

    pub fn with_tool_failure(mut self, mode: ToolFailureMode) -> Self {
        self.tool_failure = mode;
        self
    }

    /// Load configuration from environment variables, starting from defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(interval) = get_env_duration("RUNBRIDGE_POLL_INTERVAL")? {
            config.poll.initial_interval = interval;
        }
        if let Some(interval) = get_env_duration("RUNBRIDGE_POLL_MAX_INTERVAL")? {
            config.poll.max_interval = interval;
        }
        if let Some(max_polls) = get_env_u32("RUNBRIDGE_POLL_MAX_POLLS")? {
            config.poll.max_polls = max_polls;
        }
        if let Some(timeout) = get_env_duration("RUNBRIDGE_RUN_TIMEOUT")? {
            config.poll.max_wall_clock = timeout;
        }
        if let Some(attempts) = get_env_u32("RUNBRIDGE_RETRY_MAX_ATTEMPTS")? {
            config.retry.max_attempts = attempts;
        }
        if let Some(selection) = get_env_parsed("RUNBRIDGE_MESSAGE_SELECTION")? {
            config.selection = selection;
        }
        if let Some(scope) = get_env_parsed("RUNBRIDGE_MESSAGE_SCOPE")? {
            config.scope = scope;
        }
        if let Some(mode) = get_env_parsed("RUNBRIDGE_TOOL_FAILURE_MODE")? {
            config.tool_failure = mode;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll.initial_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "poll interval must be greater than 0".into(),
            ));
        }
        if self.poll.max_interval < self.poll.initial_interval {
            return Err(ConfigError::ValidationError(
                "poll max interval must not be below the initial interval".into(),
            ));
        }
        if self.poll.multiplier < 1.0 {
            return Err(ConfigError::ValidationError(
                "poll multiplier must be at least 1.0".into(),
            ));
        }
        if self.poll.max_polls == 0 {
            return Err(ConfigError::ValidationError(
                "max polls must be greater than 0".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry max attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn poll_interval_grows_to_ceiling() {
        let policy = PollPolicy::default();
        let mut interval = policy.initial_interval;
        let mut seen = vec![interval];
        for _ in 0..6 {
            interval = policy.next_interval(interval);
            seen.push(interval);
        }
        assert_eq!(seen[1], Duration::from_millis(1500));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn retry_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_secs(1));
        assert_eq!(policy.backoff(3), Duration::from_secs(2));
        assert_eq!(policy.backoff(20), Duration::from_secs(8));
    }

    #[test]
    fn retry_after_hint_wins() {
        let policy = RetryPolicy::default();
        let err = PlatformError::RateLimited {
            retry_after: Some(Duration::from_secs(3)),
        };
        assert_eq!(policy.delay_for(1, &err), Duration::from_secs(3));
        assert_eq!(
            policy.delay_for(1, &PlatformError::transport("reset")),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn keywords_parse_case_insensitively() {
        assert_eq!("FIRST".parse::<MessageSelection>(), Ok(MessageSelection::First));
        assert_eq!(" thread ".parse::<MessageScope>(), Ok(MessageScope::Thread));
        assert_eq!("abort".parse::<ToolFailureMode>(), Ok(ToolFailureMode::Abort));
        assert!("middle".parse::<MessageSelection>().is_err());
        assert_eq!(MessageSelection::Last.to_string(), "last");
    }

    #[test]
    fn defaults_are_valid() {
        let config = DriverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.selection, MessageSelection::Last);
        assert_eq!(config.scope, MessageScope::Turn);
        assert_eq!(config.tool_failure, ToolFailureMode::Report);
    }

    #[test]
    fn validation_rejects_zero_bounds() {
        let config = DriverConfig::default().with_retry(RetryPolicy::default().with_max_attempts(0));
        assert!(config.validate().is_err());

        let config = DriverConfig::default().with_poll(PollPolicy::default().with_max_polls(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_env_overrides_defaults() {
        // SAFETY: test-local variables, only read by this test
        unsafe {
            env::set_var("RUNBRIDGE_POLL_INTERVAL", "250ms");
            env::set_var("RUNBRIDGE_POLL_MAX_POLLS", "12");
            env::set_var("RUNBRIDGE_MESSAGE_SELECTION", "first");
            env::set_var("RUNBRIDGE_TOOL_FAILURE_MODE", "abort");
        }

        let config = DriverConfig::from_env().unwrap();
        assert_eq!(config.poll.initial_interval, Duration::from_millis(250));
        assert_eq!(config.poll.max_polls, 12);
        assert_eq!(config.selection, MessageSelection::First);
        assert_eq!(config.tool_failure, ToolFailureMode::Abort);

        unsafe {
            env::remove_var("RUNBRIDGE_POLL_INTERVAL");
            env::remove_var("RUNBRIDGE_POLL_MAX_POLLS");
            env::remove_var("RUNBRIDGE_MESSAGE_SELECTION");
            env::remove_var("RUNBRIDGE_TOOL_FAILURE_MODE");
        }
    }
}
