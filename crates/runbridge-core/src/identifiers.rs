//! Validated identifier types for platform-owned objects
//!
//! The hosted platform hands out opaque ids (`asst_…`, `thread_…`, `run_…`,
//! `call_…`, `msg_…`). They are never interpreted, but they are placed into
//! URL paths, so every id goes through the same validation before use.
//!
//! # Validation Rules
//!
//! - Non-empty (minimum 1 character)
//! - Maximum 128 characters
//! - No leading or trailing whitespace
//! - Only alphanumeric characters, hyphens (`-`), underscores (`_`), and dots (`.`)
//! - No path traversal sequences (`../`, `./`)
//!
//! # Examples
//!
//! ```rust
//! use runbridge_core::identifiers::{AgentId, ThreadId};
//!
//! let agent = AgentId::parse("asst_abc123").unwrap();
//! let thread: ThreadId = "thread_42".parse().unwrap();
//!
//! assert!(AgentId::parse("").is_err());
//! assert!(ThreadId::parse("thread/../admin").is_err());
//! assert_eq!(agent.as_str(), "asst_abc123");
//! assert_eq!(thread.to_string(), "thread_42");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length for all identifier types
pub const MAX_ID_LENGTH: usize = 128;

/// Error type for identifier validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdValidationError {
    #[error("Identifier cannot be empty")]
    Empty,
    #[error("Identifier cannot be whitespace-only")]
    WhitespaceOnly,
    #[error("Identifier cannot have leading or trailing whitespace")]
    LeadingTrailingWhitespace,
    #[error(
        "Identifier can only contain alphanumeric characters, hyphens, underscores, and dots"
    )]
    InvalidCharacters,
    #[error("Identifier too long ({length} chars, max {max})")]
    TooLong { length: usize, max: usize },
    #[error("Identifier cannot contain path traversal sequences (../)")]
    PathTraversal,
}

/// Validator shared by every identifier type
pub struct IdValidator;

impl IdValidator {
    /// Validate an identifier string
    pub fn validate(id: &str) -> Result<&str, IdValidationError> {
        if id.is_empty() {
            return Err(IdValidationError::Empty);
        }

        if id.trim().is_empty() {
            return Err(IdValidationError::WhitespaceOnly);
        }

        if id != id.trim() {
            return Err(IdValidationError::LeadingTrailingWhitespace);
        }

        if id.len() > MAX_ID_LENGTH {
            return Err(IdValidationError::TooLong {
                length: id.len(),
                max: MAX_ID_LENGTH,
            });
        }

        if id.contains("../") || id.contains("./") {
            return Err(IdValidationError::PathTraversal);
        }

        if !id.chars().all(Self::is_valid_char) {
            return Err(IdValidationError::InvalidCharacters);
        }

        Ok(id)
    }

    /// Check if a character is valid in an identifier
    pub fn is_valid_char(c: char) -> bool {
        c.is_alphanumeric() || c == '-' || c == '_' || c == '.'
    }
}

macro_rules! platform_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse and validate an id from a string
            pub fn parse(id: impl AsRef<str>) -> Result<Self, IdValidationError> {
                IdValidator::validate(id.as_ref()).map(|s| Self(s.to_string()))
            }

            /// Get the id as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Create an id without validation (for testing only)
            #[doc(hidden)]
            pub fn new_unchecked(id: impl Into<String>) -> Self {
                Self(id.into())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdValidationError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

platform_id!(
    /// Identifier of a hosted agent (assistant)
    AgentId
);

platform_id!(
    /// Identifier of a conversation thread
    ThreadId
);

platform_id!(
    /// Identifier of one run of an agent against a thread
    RunId
);

platform_id!(
    /// Identifier of a message on a thread
    MessageId
);

platform_id!(
    /// Correlation id of a tool call emitted during a run
    ToolCallId
);
