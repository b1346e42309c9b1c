//! Closure-backed tools

use runbridge_core::{ExecutionResult, Tool};

type Handler = dyn Fn(serde_json::Value) -> ExecutionResult + Send + Sync;

/// A tool defined by a name, a description and a closure.
///
/// Useful for small functions that do not warrant their own type.
pub struct FunctionTool {
    name: String,
    description: String,
    schema: serde_json::Value,
    handler: Box<Handler>,
}

impl FunctionTool {
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(serde_json::Value) -> ExecutionResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema: serde_json::json!({ "type": "object", "properties": {} }),
            handler: Box::new(handler),
        }
    }

    /// Set the JSON schema advertised for the arguments object.
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = schema;
        self
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        self.schema.clone()
    }

    fn call(&self, arguments: serde_json::Value) -> ExecutionResult {
        (self.handler)(arguments)
    }
}
