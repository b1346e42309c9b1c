//! Agent definitions

use crate::identifiers::AgentId;
use serde::{Deserialize, Serialize};

/// Function definition advertised to the platform for a tool-enabled agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// What to create on the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub name: String,
    pub model: String,
    pub instructions: String,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
}

impl AgentSpec {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            instructions: instructions.into(),
            tools: Vec::new(),
        }
    }

    pub fn with_tool(mut self, definition: ToolDefinition) -> Self {
        self.tools.push(definition);
        self
    }

    pub fn with_tools(mut self, definitions: impl IntoIterator<Item = ToolDefinition>) -> Self {
        self.tools.extend(definitions);
        self
    }

    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }
}

/// An agent that exists on the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub model: String,
}
