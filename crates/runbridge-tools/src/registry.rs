use runbridge_core::{ExecutionResult, Tool, ToolCallRequest, ToolDefinition, ToolError};
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for managing and dispatching tool calls.
///
/// Tool registries map the function names an agent may request to local
/// handlers. The driver resolves every pending call through a registry before
/// anything is executed, so adding or removing a tool never touches the
/// driver itself.
pub trait ToolRegistry: Send + Sync {
    /// Get a tool by name.
    fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>>;

    /// Definitions of every registered tool, as advertised to agents.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Check whether a handler is registered under `name`.
    fn contains(&self, name: &str) -> bool {
        self.get_tool(name).is_some()
    }

    /// Resolve the handler and parse the arguments of a tool call.
    ///
    /// An empty argument string is treated as an empty object.
    ///
    /// # Errors
    ///
    /// `ToolError::UnknownTool` when no handler is registered,
    /// `ToolError::InvalidArguments` when the payload is not JSON.
    fn prepare(
        &self,
        call: &ToolCallRequest,
    ) -> Result<(Arc<dyn Tool>, serde_json::Value), ToolError> {
        let tool = self
            .get_tool(&call.name)
            .ok_or_else(|| ToolError::UnknownTool {
                tool_call_id: call.id.clone(),
                name: call.name.clone(),
            })?;

        let arguments = if call.arguments.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(&call.arguments).map_err(|e| ToolError::InvalidArguments {
                name: call.name.clone(),
                reason: e.to_string(),
            })?
        };

        Ok((tool, arguments))
    }

    /// Dispatch a tool call on the current thread.
    ///
    /// Handler failures come back as `ToolError::Failed`.
    fn dispatch(&self, call: &ToolCallRequest) -> Result<String, ToolError> {
        let (tool, arguments) = self.prepare(call)?;
        match tool.call(arguments) {
            ExecutionResult::Success { output } => Ok(output),
            ExecutionResult::Failure { error } => Err(ToolError::Failed {
                name: call.name.clone(),
                reason: error,
            }),
        }
    }

    /// Verify that every advertised definition has a handler.
    ///
    /// Run this before creating a tool-enabled agent so a run can never ask
    /// for a function nobody can execute.
    fn ensure_covers(&self, definitions: &[ToolDefinition]) -> Result<(), ToolError> {
        let missing: Vec<String> = definitions
            .iter()
            .filter(|definition| !self.contains(&definition.name))
            .map(|definition| definition.name.clone())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ToolError::MissingHandlers { names: missing })
        }
    }
}

/// In-memory tool registry for local tool storage and dispatch.
///
/// # Example
///
/// ```rust
/// use runbridge_tools::{FunctionTool, InMemoryToolRegistry, ToolRegistry};
/// use runbridge_core::{ExecutionResult, ToolCallId, ToolCallRequest};
/// use std::sync::Arc;
///
/// let echo = FunctionTool::new("echo", "Echo the arguments back", |args| {
///     ExecutionResult::json(&args)
/// });
/// let registry = InMemoryToolRegistry::new().with_tool(Arc::new(echo));
///
/// let call = ToolCallRequest::new(ToolCallId::parse("call_1").unwrap(), "echo", r#"{"a":1}"#);
/// assert_eq!(registry.dispatch(&call).unwrap(), r#"{"a":1}"#);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl InMemoryToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool under its own name, replacing any previous handler.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Add a tool under its own name, replacing any previous handler.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "Replacing previously registered tool");
        }
    }

    /// Get all tool names registered in this registry, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolRegistry for InMemoryToolRegistry {
    fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.tools.values().map(|tool| tool.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }
}
