//! Wire format of the assistants-style REST API
//!
//! Request bodies are borrowed views over core types; response bodies are
//! deserialized here and converted into the core model. Identifiers are
//! validated while deserializing.

use runbridge_core::{
    Agent, AgentId, AgentSpec, ContentPart, MessageId, RequiredAction, Role, Run, RunId,
    RunLastError, RunStatus, ThreadId, ThreadMessage, ToolCallId, ToolCallRequest,
    ToolDefinition, ToolOutput,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Serialize)]
pub struct FunctionSpec<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub parameters: &'a serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ToolSpec<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionSpec<'a>,
}

impl<'a> From<&'a ToolDefinition> for ToolSpec<'a> {
    fn from(definition: &'a ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: FunctionSpec {
                name: &definition.name,
                description: &definition.description,
                parameters: &definition.parameters,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateAgentRequest<'a> {
    pub model: &'a str,
    pub name: &'a str,
    pub instructions: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec<'a>>,
}

impl<'a> From<&'a AgentSpec> for CreateAgentRequest<'a> {
    fn from(spec: &'a AgentSpec) -> Self {
        Self {
            model: &spec.model,
            name: &spec.name,
            instructions: &spec.instructions,
            tools: spec.tools.iter().map(ToolSpec::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateMessageRequest<'a> {
    pub role: Role,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateRunRequest<'a> {
    pub assistant_id: &'a AgentId,
}

#[derive(Debug, Serialize)]
pub struct SubmitToolOutputsRequest<'a> {
    pub tool_outputs: &'a [ToolOutput],
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AgentObject {
    pub id: AgentId,
    #[serde(default)]
    pub name: Option<String>,
    pub model: String,
}

impl From<AgentObject> for Agent {
    fn from(agent: AgentObject) -> Self {
        Agent {
            id: agent.id,
            name: agent.name.unwrap_or_default(),
            model: agent.model,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ThreadObject {
    pub id: ThreadId,
}

#[derive(Debug, Deserialize)]
pub struct TextObject {
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentObject {
    Text { text: TextObject },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct MessageObject {
    pub id: MessageId,
    pub thread_id: ThreadId,
    pub role: Role,
    #[serde(default)]
    pub content: Vec<ContentObject>,
    #[serde(default)]
    pub run_id: Option<RunId>,
}

impl From<MessageObject> for ThreadMessage {
    fn from(message: MessageObject) -> Self {
        ThreadMessage {
            id: message.id,
            thread_id: message.thread_id,
            role: message.role,
            content: message
                .content
                .into_iter()
                .map(|part| match part {
                    ContentObject::Text { text } => ContentPart::text(text.value),
                    ContentObject::Other => ContentPart::Other,
                })
                .collect(),
            run_id: message.run_id,
        }
    }
}

/// Paginated list envelope
#[derive(Debug, Deserialize)]
pub struct ListObject<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub last_id: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct FunctionCallObject {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
pub struct ToolCallObject {
    pub id: ToolCallId,
    pub function: FunctionCallObject,
}

#[derive(Debug, Deserialize)]
pub struct SubmitToolOutputsObject {
    #[serde(default)]
    pub tool_calls: Vec<ToolCallObject>,
}

#[derive(Debug, Deserialize)]
pub struct RequiredActionObject {
    #[serde(default)]
    pub submit_tool_outputs: Option<SubmitToolOutputsObject>,
}

#[derive(Debug, Deserialize)]
pub struct LastErrorObject {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RunObject {
    pub id: RunId,
    pub thread_id: ThreadId,
    pub assistant_id: AgentId,
    pub status: RunStatus,
    #[serde(default)]
    pub required_action: Option<RequiredActionObject>,
    #[serde(default)]
    pub last_error: Option<LastErrorObject>,
}

impl From<RunObject> for Run {
    fn from(run: RunObject) -> Self {
        let required_action = run
            .required_action
            .and_then(|action| action.submit_tool_outputs)
            .map(|submit| RequiredAction::SubmitToolOutputs {
                tool_calls: submit
                    .tool_calls
                    .into_iter()
                    .map(|call| {
                        ToolCallRequest::new(call.id, call.function.name, call.function.arguments)
                    })
                    .collect(),
            });

        Run {
            id: run.id,
            thread_id: run.thread_id,
            agent_id: run.assistant_id,
            status: run.status,
            required_action,
            last_error: run.last_error.map(|e| RunLastError {
                code: e.code.unwrap_or_default(),
                message: e.message.unwrap_or_default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_with_required_action_converts() {
        let wire: RunObject = serde_json::from_value(json!({
            "id": "run_1",
            "object": "thread.run",
            "thread_id": "thread_1",
            "assistant_id": "asst_1",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": "{\"location\":\"Paris\"}"}
                    }]
                }
            },
            "last_error": null
        }))
        .unwrap();

        let run = Run::from(wire);
        assert_eq!(run.status, RunStatus::RequiresAction);
        let calls = run.pending_tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id.as_str(), "call_1");
        assert_eq!(calls[0].name, "get_weather");
        assert_eq!(calls[0].arguments, r#"{"location":"Paris"}"#);
        assert!(run.last_error.is_none());
    }

    #[test]
    fn failed_run_keeps_last_error() {
        let wire: RunObject = serde_json::from_value(json!({
            "id": "run_1",
            "thread_id": "thread_1",
            "assistant_id": "asst_1",
            "status": "failed",
            "last_error": {"code": "server_error", "message": "model overloaded"}
        }))
        .unwrap();

        let run = Run::from(wire);
        assert_eq!(
            run.last_error,
            Some(RunLastError {
                code: "server_error".into(),
                message: "model overloaded".into()
            })
        );
    }

    #[test]
    fn message_text_parts_and_unknown_parts() {
        let wire: MessageObject = serde_json::from_value(json!({
            "id": "msg_1",
            "thread_id": "thread_1",
            "role": "assistant",
            "content": [
                {"type": "text", "text": {"value": "Hello", "annotations": []}},
                {"type": "image_file", "image_file": {"file_id": "f1"}}
            ],
            "run_id": "run_1"
        }))
        .unwrap();

        let message = ThreadMessage::from(wire);
        assert_eq!(message.text(), "Hello");
        assert_eq!(message.content.len(), 2);
        assert_eq!(message.content[1], ContentPart::Other);
    }

    #[test]
    fn invalid_identifier_is_rejected() {
        let result = serde_json::from_value::<ThreadObject>(json!({"id": "../etc"}));
        assert!(result.is_err());
    }

    #[test]
    fn create_agent_request_shape() {
        let spec = AgentSpec::new("weather", "gpt-4o", "Use the tool").with_tool(
            ToolDefinition::new(
                "fetch_weather",
                "Weather",
                json!({"type": "object", "properties": {}}),
            ),
        );
        let body = serde_json::to_value(CreateAgentRequest::from(&spec)).unwrap();
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "fetch_weather");

        let plain = AgentSpec::new("planner", "gpt-4o", "Plan");
        let body = serde_json::to_value(CreateAgentRequest::from(&plain)).unwrap();
        assert!(body.get("tools").is_none());
    }
}
