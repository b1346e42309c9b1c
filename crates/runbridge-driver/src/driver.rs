//! # Run Driver
//!
//! Drives one turn of a conversation: post the user message, start a run,
//! poll it, satisfy tool calls with local handlers and return the agent's
//! reply once the run completes.
//!
//! ```text
//! create message ─► create run ─► poll ──► completed ─► list messages ─► reply
//!                                  │  ▲
//!                   requires_action│  │submit outputs (one batch)
//!                                  ▼  │
//!                              execute tools
//! ```
//!
//! Every platform call is retried according to [`RetryPolicy`](crate::RetryPolicy).
//! Polling is bounded by [`PollPolicy`](crate::PollPolicy); a run that
//! exceeds its budget, asks for an unknown tool or is abandoned by the
//! caller is cancelled on the platform on a best-effort basis.

use crate::dispatch::{ToolInvocation, execute_batch, find_unknown};
use crate::error::RunError;
use crate::policy::{DriverConfig, MessageScope, MessageSelection};
use crate::retry::with_retry;
use runbridge_core::{
    AgentId, AgentPlatform, MessageId, PlatformError, Role, Run, RunId, RunStatus, ThreadId,
    ThreadMessage, ToolCallId, ToolCallRequest, ToolOutput,
};
use runbridge_tools::ToolRegistry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where a turn happens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnContext {
    pub thread_id: ThreadId,
    pub agent_id: AgentId,
}

impl TurnContext {
    pub fn new(thread_id: ThreadId, agent_id: AgentId) -> Self {
        Self {
            thread_id,
            agent_id,
        }
    }
}

/// Result of a successful turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub run_id: RunId,
    /// Id of the selected assistant message
    pub message_id: MessageId,
    /// Text of the selected assistant message
    pub text: String,
    /// Tool calls executed during the run, in execution order
    pub tool_invocations: Vec<ToolInvocation>,
    /// Run snapshots fetched by polling or returned by submissions
    pub polls: u32,
    pub elapsed: Duration,
}

/// Drives agent runs against an [`AgentPlatform`] with local tools.
///
/// Cheap to clone; clones share the platform client and tool registry.
/// Callers must not start two turns on the same thread concurrently.
#[derive(Clone)]
pub struct RunDriver {
    platform: Arc<dyn AgentPlatform>,
    tools: Arc<dyn ToolRegistry>,
    config: DriverConfig,
}

impl std::fmt::Debug for RunDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunDriver")
            .field("tools", &self.tools.definitions().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Per-run bookkeeping for at-most-once tool execution
#[derive(Default)]
struct ToolLedger {
    /// Outputs already produced, by call id
    executed: HashMap<ToolCallId, ToolOutput>,
    /// Call ids whose outputs the platform accepted
    submitted: HashSet<ToolCallId>,
    invocations: Vec<ToolInvocation>,
}

enum Submission {
    Accepted(Run),
    /// The platform already moved past the batch (an earlier attempt landed)
    AlreadyApplied(Run),
}

impl RunDriver {
    pub fn new(platform: Arc<dyn AgentPlatform>, tools: Arc<dyn ToolRegistry>) -> Self {
        Self {
            platform,
            tools,
            config: DriverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn platform(&self) -> &Arc<dyn AgentPlatform> {
        &self.platform
    }

    pub fn tools(&self) -> &Arc<dyn ToolRegistry> {
        &self.tools
    }

    /// Run one turn and return the agent's reply
    pub async fn run_turn(
        &self,
        ctx: &TurnContext,
        user_message: &str,
    ) -> Result<TurnOutcome, RunError> {
        self.run_turn_with_cancel(ctx, user_message, CancellationToken::new())
            .await
    }

    /// Run one turn, giving up when `cancel` fires
    pub async fn run_turn_with_cancel(
        &self,
        ctx: &TurnContext,
        user_message: &str,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome, RunError> {
        if user_message.trim().is_empty() {
            return Err(RunError::InvalidInput {
                reason: "user message must not be empty".into(),
            });
        }
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled { run_id: None });
        }

        info!(thread_id = %ctx.thread_id, agent_id = %ctx.agent_id, "Starting turn");

        let user = with_retry(&self.config.retry, "create message", &cancel, || {
            self.platform
                .create_message(&ctx.thread_id, Role::User, user_message)
        })
        .await?;

        let run = with_retry(&self.config.retry, "create run", &cancel, || {
            self.platform.create_run(&ctx.thread_id, &ctx.agent_id)
        })
        .await?;
        let run_id = run.id.clone();
        debug!(run_id = %run_id, status = %run.status, "Run created");

        let result = self.drive(ctx, run, &user.id, &cancel).await;

        match result {
            Ok(outcome) => {
                info!(
                    thread_id = %ctx.thread_id,
                    run_id = %outcome.run_id,
                    polls = outcome.polls,
                    tools = outcome.tool_invocations.len(),
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "Turn completed"
                );
                Ok(outcome)
            }
            Err(RunError::Cancelled { .. }) => {
                self.cancel_best_effort(ctx, &run_id).await;
                Err(RunError::Cancelled {
                    run_id: Some(run_id),
                })
            }
            Err(
                error @ (RunError::Timeout { .. }
                | RunError::UnknownTool { .. }
                | RunError::ToolExecution { .. }),
            ) => {
                self.cancel_best_effort(ctx, &run_id).await;
                Err(error)
            }
            Err(error) => Err(error),
        }
    }

    /// Poll the run to a terminal status, satisfying tool calls on the way
    async fn drive(
        &self,
        ctx: &TurnContext,
        mut run: Run,
        user_message_id: &MessageId,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, RunError> {
        let poll = &self.config.poll;
        let started = Instant::now();
        let mut polls: u32 = 0;
        let mut interval = poll.initial_interval;
        let mut ledger = ToolLedger::default();

        loop {
            let status = run.status;
            match status {
                RunStatus::Completed => break,
                RunStatus::Failed => {
                    let (code, message) = run
                        .last_error
                        .map(|e| (e.code, e.message))
                        .unwrap_or_else(|| ("unknown".into(), "run failed without details".into()));
                    warn!(run_id = %run.id, code = %code, "Run failed");
                    return Err(RunError::RunFailed {
                        run_id: run.id,
                        code,
                        message,
                    });
                }
                _ if status.is_terminal() => {
                    warn!(run_id = %run.id, status = %status, "Run ended");
                    return Err(RunError::RunEnded {
                        run_id: run.id,
                        status,
                    });
                }
                _ => {}
            }

            let elapsed = started.elapsed();
            if polls >= poll.max_polls || elapsed >= poll.max_wall_clock {
                warn!(run_id = %run.id, polls, elapsed_ms = elapsed.as_millis() as u64, "Run timed out");
                return Err(RunError::Timeout {
                    run_id: run.id,
                    polls,
                    elapsed,
                });
            }

            if run.status == RunStatus::RequiresAction {
                let fresh: Vec<ToolCallRequest> = run
                    .pending_tool_calls()
                    .iter()
                    .filter(|call| !ledger.submitted.contains(&call.id))
                    .cloned()
                    .collect();

                if fresh.is_empty() {
                    debug!(run_id = %run.id, "Pending tool calls already submitted");
                } else {
                    run = self
                        .satisfy_tool_calls(ctx, &run.id, &fresh, &mut ledger, cancel)
                        .await?;
                    // The snapshot returned by a submission counts against the budget
                    polls += 1;
                    interval = poll.initial_interval;
                    continue;
                }
            }

            let sleep_for = interval.min(poll.max_wall_clock - elapsed);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(RunError::Cancelled { run_id: Some(run.id.clone()) });
                }
                _ = tokio::time::sleep(sleep_for) => {}
            }
            interval = poll.next_interval(interval);

            let next = with_retry(&self.config.retry, "get run", cancel, || {
                self.platform.get_run(&ctx.thread_id, &run.id)
            })
            .await?;
            polls += 1;

            if next.status != run.status {
                if !run.status.can_transition_to(next.status) {
                    warn!(
                        run_id = %run.id,
                        from = %run.status,
                        to = %next.status,
                        "Run moved backwards"
                    );
                }
                debug!(run_id = %run.id, status = %next.status, polls, "Run status changed");
            }
            run = next;
        }

        let messages = with_retry(&self.config.retry, "list messages", cancel, || {
            self.platform.list_messages(&ctx.thread_id)
        })
        .await?;

        let reply = select_reply(
            &messages,
            self.config.selection,
            self.config.scope,
            user_message_id,
            &run.id,
        )
        .ok_or_else(|| RunError::NoAssistantReply {
            run_id: run.id.clone(),
        })?;

        Ok(TurnOutcome {
            run_id: run.id,
            message_id: reply.id.clone(),
            text: reply.text(),
            tool_invocations: ledger.invocations,
            polls,
            elapsed: started.elapsed(),
        })
    }

    /// Execute the fresh calls of a `requires_action` snapshot and submit the batch
    async fn satisfy_tool_calls(
        &self,
        ctx: &TurnContext,
        run_id: &RunId,
        calls: &[ToolCallRequest],
        ledger: &mut ToolLedger,
        cancel: &CancellationToken,
    ) -> Result<Run, RunError> {
        if let Some(unknown) = find_unknown(self.tools.as_ref(), calls) {
            warn!(run_id = %run_id, tool = %unknown.name, tool_call_id = %unknown.id, "Agent requested an unknown tool");
            return Err(RunError::UnknownTool {
                run_id: run_id.clone(),
                tool_call_id: unknown.id.clone(),
                name: unknown.name.clone(),
            });
        }

        let to_execute: Vec<ToolCallRequest> = calls
            .iter()
            .filter(|call| !ledger.executed.contains_key(&call.id))
            .cloned()
            .collect();

        if !to_execute.is_empty() {
            let invocations = execute_batch(&self.tools, &to_execute, self.config.tool_failure)
                .await
                .map_err(|source| RunError::ToolExecution {
                    run_id: run_id.clone(),
                    source,
                })?;
            for invocation in invocations {
                ledger
                    .executed
                    .insert(invocation.tool_call_id.clone(), invocation.to_output());
                ledger.invocations.push(invocation);
            }
        }

        if cancel.is_cancelled() {
            return Err(RunError::Cancelled {
                run_id: Some(run_id.clone()),
            });
        }

        let outputs: Vec<ToolOutput> = calls
            .iter()
            .filter_map(|call| ledger.executed.get(&call.id).cloned())
            .collect();

        let run = match self.submit_outputs(ctx, run_id, &outputs, cancel).await? {
            Submission::Accepted(run) => run,
            Submission::AlreadyApplied(run) => {
                info!(run_id = %run_id, "Tool outputs were already applied by an earlier attempt");
                run
            }
        };
        ledger
            .submitted
            .extend(outputs.into_iter().map(|output| output.tool_call_id));

        debug!(run_id = %run_id, status = %run.status, "Tool outputs submitted");
        Ok(run)
    }

    /// Submit one batch, reusing it verbatim on every retry.
    ///
    /// A conflict or bad-request answer after a transport failure may mean an
    /// earlier attempt was applied; the run is re-fetched to find out.
    async fn submit_outputs(
        &self,
        ctx: &TurnContext,
        run_id: &RunId,
        outputs: &[ToolOutput],
        cancel: &CancellationToken,
    ) -> Result<Submission, RunError> {
        let policy = &self.config.retry;
        let mut attempt: u32 = 1;
        let mut delivery_uncertain = false;

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RunError::Cancelled { run_id: Some(run_id.clone()) }),
                result = self.platform.submit_tool_outputs(&ctx.thread_id, run_id, outputs) => result,
            };

            let error = match result {
                Ok(run) => return Ok(Submission::Accepted(run)),
                Err(error) => error,
            };

            match error {
                PlatformError::Conflict { .. } | PlatformError::InvalidRequest { .. }
                    if delivery_uncertain =>
                {
                    let run = with_retry(policy, "get run", cancel, || {
                        self.platform.get_run(&ctx.thread_id, run_id)
                    })
                    .await?;
                    if still_awaits(&run, outputs) {
                        return Err(RunError::Platform(error));
                    }
                    return Ok(Submission::AlreadyApplied(run));
                }
                error if error.is_retryable() => {
                    if matches!(error, PlatformError::Transport { .. }) {
                        delivery_uncertain = true;
                    }
                    if attempt >= policy.max_attempts {
                        return Err(RunError::PlatformUnavailable {
                            operation: "submit tool outputs",
                            attempts: attempt,
                            source: error,
                        });
                    }
                    let delay = policy.delay_for(attempt, &error);
                    warn!(
                        run_id = %run_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Tool output submission failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(RunError::Cancelled { run_id: Some(run_id.clone()) }),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                error => return Err(RunError::Platform(error)),
            }
        }
    }

    /// Ask the platform to stop a run, ignoring failures
    async fn cancel_best_effort(&self, ctx: &TurnContext, run_id: &RunId) {
        match self.platform.cancel_run(&ctx.thread_id, run_id).await {
            Ok(run) => debug!(run_id = %run_id, status = %run.status, "Run cancelled"),
            Err(error) => warn!(run_id = %run_id, error = %error, "Failed to cancel run"),
        }
    }
}

/// Whether `run` still waits for any of the calls answered by `outputs`
fn still_awaits(run: &Run, outputs: &[ToolOutput]) -> bool {
    run.pending_tool_calls()
        .iter()
        .any(|call| outputs.iter().any(|o| o.tool_call_id == call.id))
}

/// Pick the reply among the thread's messages.
///
/// `Turn` scope covers messages after the turn's user message; when that
/// message is not in the listing, messages produced by `run_id` are used.
pub fn select_reply<'a>(
    messages: &'a [ThreadMessage],
    selection: MessageSelection,
    scope: MessageScope,
    user_message_id: &MessageId,
    run_id: &RunId,
) -> Option<&'a ThreadMessage> {
    let in_scope: Vec<&ThreadMessage> = match scope {
        MessageScope::Thread => messages.iter().filter(|m| m.is_assistant()).collect(),
        MessageScope::Turn => match messages.iter().position(|m| &m.id == user_message_id) {
            Some(index) => messages[index + 1..]
                .iter()
                .filter(|m| m.is_assistant())
                .collect(),
            None => messages
                .iter()
                .filter(|m| m.is_assistant() && m.run_id.as_ref() == Some(run_id))
                .collect(),
        },
    };

    match selection {
        MessageSelection::First => in_scope.first().copied(),
        MessageSelection::Last => in_scope.last().copied(),
    }
}
