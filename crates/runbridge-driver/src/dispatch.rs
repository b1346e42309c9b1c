//! Executing a batch of tool calls

use crate::policy::ToolFailureMode;
use runbridge_core::{ExecutionResult, ToolCallId, ToolCallRequest, ToolError, ToolOutput};
use runbridge_tools::ToolRegistry;
use std::sync::Arc;
use tracing::{debug, warn};

/// Record of one executed tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub tool_call_id: ToolCallId,
    pub name: String,
    pub succeeded: bool,
    /// Output submitted for the call
    pub output: String,
}

impl ToolInvocation {
    pub fn to_output(&self) -> ToolOutput {
        ToolOutput::new(self.tool_call_id.clone(), self.output.clone())
    }
}

/// First call in the batch whose name has no handler
pub fn find_unknown<'a>(
    registry: &dyn ToolRegistry,
    calls: &'a [ToolCallRequest],
) -> Option<&'a ToolCallRequest> {
    calls.iter().find(|call| !registry.contains(&call.name))
}

/// Execute one call on the blocking pool
async fn execute_call(registry: &Arc<dyn ToolRegistry>, call: &ToolCallRequest) -> Result<String, ToolError> {
    let (tool, arguments) = registry.prepare(call)?;
    let name = call.name.clone();

    let result = tokio::task::spawn_blocking(move || tool.call(arguments))
        .await
        .map_err(|e| ToolError::Failed {
            name: name.clone(),
            reason: if e.is_panic() {
                "tool handler panicked".to_string()
            } else {
                format!("tool task did not complete: {}", e)
            },
        })?;

    match result {
        ExecutionResult::Success { output } => Ok(output),
        ExecutionResult::Failure { error } => Err(ToolError::Failed {
            name,
            reason: error,
        }),
    }
}

/// Execute every call of a batch in order.
///
/// Callers check [`find_unknown`] first; an unknown name that slips through
/// is reported like any other failure. Under [`ToolFailureMode::Report`] a
/// failing call yields an `{"error": ...}` output; under
/// [`ToolFailureMode::Abort`] the first failure is returned.
pub async fn execute_batch(
    registry: &Arc<dyn ToolRegistry>,
    calls: &[ToolCallRequest],
    mode: ToolFailureMode,
) -> Result<Vec<ToolInvocation>, ToolError> {
    let mut invocations = Vec::with_capacity(calls.len());

    for call in calls {
        debug!(tool = %call.name, tool_call_id = %call.id, "Executing tool call");

        let invocation = match execute_call(registry, call).await {
            Ok(output) => ToolInvocation {
                tool_call_id: call.id.clone(),
                name: call.name.clone(),
                succeeded: true,
                output,
            },
            Err(error) if mode == ToolFailureMode::Abort => return Err(error),
            Err(error) => {
                warn!(tool = %call.name, tool_call_id = %call.id, error = %error, "Tool call failed, reporting error output");
                ToolInvocation {
                    tool_call_id: call.id.clone(),
                    name: call.name.clone(),
                    succeeded: false,
                    output: error.to_output_payload(),
                }
            }
        };
        invocations.push(invocation);
    }

    Ok(invocations)
}
