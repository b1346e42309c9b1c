//! Local tools that satisfy tool calls emitted by hosted agents

use crate::agent::ToolDefinition;
use serde::Serialize;

/// Result of a tool invocation.
///
/// The `output` of a successful invocation is submitted to the platform
/// verbatim, so tools that return structured data should build it with
/// [`ExecutionResult::json`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Tool executed successfully with the given output.
    Success { output: String },

    /// Tool could not complete the requested operation.
    Failure { error: String },
}

impl ExecutionResult {
    /// Create a successful execution result.
    pub fn success(output: impl Into<String>) -> Self {
        ExecutionResult::Success {
            output: output.into(),
        }
    }

    /// Create a failed execution result.
    pub fn failure(error: impl Into<String>) -> Self {
        ExecutionResult::Failure {
            error: error.into(),
        }
    }

    /// Serialize `value` as the tool output.
    ///
    /// A consumer parsing the output as JSON gets `value` back.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(output) => ExecutionResult::Success { output },
            Err(e) => ExecutionResult::failure(format!("Failed to serialize tool output: {}", e)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ExecutionResult::Failure { .. })
    }

    /// Get the output string (for success) or error message (for failure).
    pub fn output(&self) -> &str {
        match self {
            ExecutionResult::Success { output } => output,
            ExecutionResult::Failure { error } => error,
        }
    }
}

/// A named, synchronous callable the driver can execute on behalf of an agent.
///
/// Implementations may block (network I/O, disk); the driver always calls
/// them from the blocking thread pool, never from an async task.
pub trait Tool: Send + Sync {
    /// Function name the agent uses to request this tool.
    fn name(&self) -> &str;

    /// Human-readable description advertised to the model.
    fn description(&self) -> &str {
        ""
    }

    /// JSON schema of the arguments object.
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    /// Definition advertised to the platform when creating an agent.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters_schema())
    }

    /// Execute the tool with already-parsed JSON arguments.
    fn call(&self, arguments: serde_json::Value) -> ExecutionResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Upper;

    impl Tool for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn call(&self, arguments: serde_json::Value) -> ExecutionResult {
            match arguments.get("text").and_then(|v| v.as_str()) {
                Some(text) => ExecutionResult::success(text.to_uppercase()),
                None => ExecutionResult::failure("missing 'text'"),
            }
        }
    }

    #[test]
    fn json_output_parses_back_to_the_value() {
        let value = json!({"city": "Paris", "temps": [21.5, 19.0], "ok": true});
        let result = ExecutionResult::json(&value);
        let parsed: serde_json::Value = serde_json::from_str(result.output()).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn json_output_of_plain_string_is_quoted() {
        let result = ExecutionResult::json("22C, clear");
        assert_eq!(result.output(), "\"22C, clear\"");
    }

    #[test]
    fn default_definition_uses_name_and_empty_object_schema() {
        let definition = Upper.definition();
        assert_eq!(definition.name, "upper");
        assert_eq!(definition.parameters["type"], "object");
    }

    #[test]
    fn call_reports_failures() {
        assert_eq!(
            Upper.call(json!({"text": "hi"})),
            ExecutionResult::success("HI")
        );
        assert!(Upper.call(json!({})).is_failure());
    }
}
