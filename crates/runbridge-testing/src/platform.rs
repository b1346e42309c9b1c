//! # Scripted Platform
//!
//! An in-memory [`AgentPlatform`] whose runs follow scripted status
//! sequences. Threads, agents and messages behave like the hosted service:
//! a thread accepts one active run at a time, a run waiting in
//! `requires_action` only moves on once outputs for exactly its pending
//! calls are submitted, and a completed run appends its reply to the thread.
//!
//! Transient failures can be injected per operation, either before the
//! operation takes effect or after it was applied (a lost response).

use async_trait::async_trait;
use runbridge_core::{
    Agent, AgentId, AgentPlatform, AgentSpec, ContentPart, MessageId, PlatformError,
    PlatformResult, RequiredAction, Role, Run, RunId, RunLastError, RunStatus, ThreadId,
    ThreadMessage, ToolCallId, ToolCallRequest, ToolOutput,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Platform operations, used to count calls and target injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAgent,
    DeleteAgent,
    CreateThread,
    DeleteThread,
    CreateMessage,
    ListMessages,
    CreateRun,
    GetRun,
    SubmitToolOutputs,
    CancelRun,
}

/// One scripted observation of a run
#[derive(Debug, Clone)]
pub enum Step {
    /// The run reports this status
    Status(RunStatus),
    /// The run waits for outputs for these calls
    RequiresAction(Vec<ToolCallRequest>),
    /// The run reports `requires_action` for these calls once, then moves on
    /// without waiting (a stale snapshot after a submission)
    StaleRequiresAction(Vec<ToolCallRequest>),
    /// The run fails with this error
    Failed(RunLastError),
}

/// What a completed run appends to its thread
#[derive(Debug, Clone)]
pub enum Reply {
    Nothing,
    Text(String),
    /// Several assistant messages, in order
    Texts(Vec<String>),
    /// `echo: <last user message>`
    EchoUser,
}

/// Status sequence a run walks through, one step per `get_run`
#[derive(Debug, Clone)]
pub struct RunScript {
    steps: Vec<Step>,
    reply: Reply,
    advance_on_submit: bool,
}

impl Default for RunScript {
    fn default() -> Self {
        Self::new()
    }
}

impl RunScript {
    /// An empty script; the run stays `queued` until steps are added
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            reply: Reply::Nothing,
            advance_on_submit: false,
        }
    }

    /// `in_progress` then `completed` with `reply`
    pub fn completing_with(reply: impl Into<String>) -> Self {
        Self::new()
            .then(RunStatus::InProgress)
            .completes_with(reply)
    }

    /// `in_progress` then `completed`, echoing the last user message
    pub fn echo() -> Self {
        let mut script = Self::new()
            .then(RunStatus::InProgress)
            .then(RunStatus::Completed);
        script.reply = Reply::EchoUser;
        script
    }

    /// `in_progress` forever
    pub fn stuck_in_progress() -> Self {
        Self::new().then(RunStatus::InProgress)
    }

    /// Answer each accepted submission with the next step instead of `in_progress`
    pub fn advancing_on_submit(mut self) -> Self {
        self.advance_on_submit = true;
        self
    }

    pub fn then(mut self, status: RunStatus) -> Self {
        self.steps.push(Step::Status(status));
        self
    }

    pub fn requires_action(mut self, tool_calls: Vec<ToolCallRequest>) -> Self {
        self.steps.push(Step::RequiresAction(tool_calls));
        self
    }

    pub fn stale_requires_action(mut self, tool_calls: Vec<ToolCallRequest>) -> Self {
        self.steps.push(Step::StaleRequiresAction(tool_calls));
        self
    }

    pub fn fails(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.steps.push(Step::Failed(RunLastError {
            code: code.into(),
            message: message.into(),
        }));
        self
    }

    pub fn completes_with(mut self, reply: impl Into<String>) -> Self {
        self.steps.push(Step::Status(RunStatus::Completed));
        self.reply = Reply::Text(reply.into());
        self
    }

    /// `completed`, appending every reply as its own assistant message
    pub fn completes_with_all(mut self, replies: Vec<String>) -> Self {
        self.steps.push(Step::Status(RunStatus::Completed));
        self.reply = Reply::Texts(replies);
        self
    }

    pub fn completes_without_reply(mut self) -> Self {
        self.steps.push(Step::Status(RunStatus::Completed));
        self.reply = Reply::Nothing;
        self
    }
}

/// Build a tool call request for scripts
pub fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCallRequest {
    ToolCallRequest::new(ToolCallId::new_unchecked(id), name, arguments)
}

#[derive(Debug)]
struct InjectedFailure {
    operation: Operation,
    error: PlatformError,
    after_apply: bool,
}

#[derive(Debug)]
struct RunState {
    run: Run,
    steps: VecDeque<Step>,
    reply: Reply,
    replied: bool,
    awaiting_outputs: bool,
    advance_on_submit: bool,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    agents: HashMap<AgentId, AgentSpec>,
    threads: HashMap<ThreadId, Vec<ThreadMessage>>,
    runs: HashMap<RunId, RunState>,
    scripts: VecDeque<RunScript>,
    fallback: Option<RunScript>,
    failures: Vec<InjectedFailure>,
    calls: HashMap<Operation, usize>,
    submissions: Vec<(RunId, Vec<ToolOutput>)>,
    cancelled: Vec<RunId>,
    deleted_agents: Vec<AgentId>,
    deleted_threads: Vec<ThreadId>,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_{}", prefix, self.next_id)
    }

    fn take_failure(&mut self, operation: Operation) -> Option<InjectedFailure> {
        let index = self
            .failures
            .iter()
            .position(|f| f.operation == operation)?;
        Some(self.failures.remove(index))
    }

    fn thread_messages(&mut self, thread_id: &ThreadId) -> PlatformResult<&mut Vec<ThreadMessage>> {
        self.threads
            .get_mut(thread_id)
            .ok_or_else(|| PlatformError::not_found(format!("threads/{}", thread_id)))
    }

    fn has_active_run(&self, thread_id: &ThreadId) -> bool {
        self.runs
            .values()
            .any(|r| &r.run.thread_id == thread_id && !r.run.status.is_terminal())
    }

    fn push_message(
        &mut self,
        thread_id: &ThreadId,
        role: Role,
        text: &str,
        run_id: Option<RunId>,
    ) -> PlatformResult<ThreadMessage> {
        let id = MessageId::new_unchecked(self.next_id("msg"));
        let message = ThreadMessage {
            id,
            thread_id: thread_id.clone(),
            role,
            content: vec![ContentPart::text(text)],
            run_id,
        };
        self.thread_messages(thread_id)?.push(message.clone());
        Ok(message)
    }

    fn run_state(&mut self, thread_id: &ThreadId, run_id: &RunId) -> PlatformResult<&mut RunState> {
        self.runs
            .get_mut(run_id)
            .filter(|r| &r.run.thread_id == thread_id)
            .ok_or_else(|| PlatformError::not_found(format!("threads/{}/runs/{}", thread_id, run_id)))
    }

    /// Move a run to its next scripted step
    fn advance(&mut self, run_id: &RunId) -> PlatformResult<Run> {
        let Some(state) = self.runs.get_mut(run_id) else {
            return Err(PlatformError::not_found(format!("runs/{}", run_id)));
        };

        if !state.run.status.is_terminal() && !state.awaiting_outputs {
            if let Some(step) = state.steps.pop_front() {
                state.run.required_action = None;
                match step {
                    Step::Status(status) => state.run.status = status,
                    Step::RequiresAction(tool_calls) => {
                        state.run.status = RunStatus::RequiresAction;
                        state.run.required_action =
                            Some(RequiredAction::SubmitToolOutputs { tool_calls });
                        state.awaiting_outputs = true;
                    }
                    Step::StaleRequiresAction(tool_calls) => {
                        state.run.status = RunStatus::RequiresAction;
                        state.run.required_action =
                            Some(RequiredAction::SubmitToolOutputs { tool_calls });
                    }
                    Step::Failed(error) => {
                        state.run.status = RunStatus::Failed;
                        state.run.last_error = Some(error);
                    }
                }
            }
        }

        let run = state.run.clone();
        if run.status == RunStatus::Completed && !state.replied {
            state.replied = true;
            let reply = state.reply.clone();
            let texts = match reply {
                Reply::Nothing => Vec::new(),
                Reply::Text(text) => vec![text],
                Reply::Texts(texts) => texts,
                Reply::EchoUser => {
                    let last_user = self
                        .threads
                        .get(&run.thread_id)
                        .and_then(|messages| messages.iter().rev().find(|m| m.role == Role::User))
                        .map(|m| m.text())
                        .unwrap_or_default();
                    vec![format!("echo: {}", last_user)]
                }
            };
            for text in texts {
                self.push_message(&run.thread_id, Role::Assistant, &text, Some(run.id.clone()))?;
            }
        }

        Ok(run)
    }
}

/// In-memory, scripted [`AgentPlatform`]
#[derive(Debug, Default)]
pub struct ScriptedPlatform {
    state: Mutex<State>,
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a script for the next created run
    pub fn with_run(self, script: RunScript) -> Self {
        self.push_run(script);
        self
    }

    /// Script used when no queued script is left (default: [`RunScript::echo`])
    pub fn with_fallback(self, script: RunScript) -> Self {
        self.state().fallback = Some(script);
        self
    }

    pub fn push_run(&self, script: RunScript) {
        self.state().scripts.push_back(script);
    }

    /// Fail the next call of `operation` before it takes effect
    pub fn fail_next(&self, operation: Operation, error: PlatformError) {
        self.state().failures.push(InjectedFailure {
            operation,
            error,
            after_apply: false,
        });
    }

    /// Apply the next call of `operation`, then report `error` to the caller
    pub fn fail_after_apply(&self, operation: Operation, error: PlatformError) {
        self.state().failures.push(InjectedFailure {
            operation,
            error,
            after_apply: true,
        });
    }

    /// Append a message to an existing thread without counting a call
    pub fn seed_message(&self, thread_id: &ThreadId, role: Role, text: &str) -> PlatformResult<MessageId> {
        self.state()
            .push_message(thread_id, role, text, None)
            .map(|m| m.id)
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        self.state().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Every accepted submission, in order
    pub fn submissions(&self) -> Vec<(RunId, Vec<ToolOutput>)> {
        self.state().submissions.clone()
    }

    pub fn cancelled_runs(&self) -> Vec<RunId> {
        self.state().cancelled.clone()
    }

    pub fn deleted_agents(&self) -> Vec<AgentId> {
        self.state().deleted_agents.clone()
    }

    pub fn deleted_threads(&self) -> Vec<ThreadId> {
        self.state().deleted_threads.clone()
    }

    /// Specs of the agents that currently exist
    pub fn agents(&self) -> Vec<AgentSpec> {
        self.state().agents.values().cloned().collect()
    }

    pub fn live_thread_count(&self) -> usize {
        self.state().threads.len()
    }

    pub fn messages(&self, thread_id: &ThreadId) -> Vec<ThreadMessage> {
        self.state()
            .threads
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn run(&self, run_id: &RunId) -> Option<Run> {
        self.state().runs.get(run_id).map(|r| r.run.clone())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count the call, apply injected failures, then run `op` on the state
    fn intercept<T>(
        &self,
        operation: Operation,
        op: impl FnOnce(&mut State) -> PlatformResult<T>,
    ) -> PlatformResult<T> {
        let mut state = self.state();
        *state.calls.entry(operation).or_default() += 1;

        match state.take_failure(operation) {
            Some(InjectedFailure {
                error,
                after_apply: false,
                ..
            }) => Err(error),
            Some(InjectedFailure {
                error,
                after_apply: true,
                ..
            }) => {
                let _ = op(&mut *state);
                Err(error)
            }
            None => op(&mut *state),
        }
    }
}

#[async_trait]
impl AgentPlatform for ScriptedPlatform {
    async fn create_agent(&self, spec: &AgentSpec) -> PlatformResult<Agent> {
        self.intercept(Operation::CreateAgent, |state| {
            let id = AgentId::new_unchecked(state.next_id("asst"));
            state.agents.insert(id.clone(), spec.clone());
            Ok(Agent {
                id,
                name: spec.name.clone(),
                model: spec.model.clone(),
            })
        })
    }

    async fn delete_agent(&self, agent_id: &AgentId) -> PlatformResult<()> {
        self.intercept(Operation::DeleteAgent, |state| {
            state
                .agents
                .remove(agent_id)
                .ok_or_else(|| PlatformError::not_found(format!("assistants/{}", agent_id)))?;
            state.deleted_agents.push(agent_id.clone());
            Ok(())
        })
    }

    async fn create_thread(&self) -> PlatformResult<ThreadId> {
        self.intercept(Operation::CreateThread, |state| {
            let id = ThreadId::new_unchecked(state.next_id("thread"));
            state.threads.insert(id.clone(), Vec::new());
            Ok(id)
        })
    }

    async fn delete_thread(&self, thread_id: &ThreadId) -> PlatformResult<()> {
        self.intercept(Operation::DeleteThread, |state| {
            state
                .threads
                .remove(thread_id)
                .ok_or_else(|| PlatformError::not_found(format!("threads/{}", thread_id)))?;
            state.deleted_threads.push(thread_id.clone());
            Ok(())
        })
    }

    async fn create_message(
        &self,
        thread_id: &ThreadId,
        role: Role,
        content: &str,
    ) -> PlatformResult<ThreadMessage> {
        self.intercept(Operation::CreateMessage, |state| {
            state.thread_messages(thread_id)?;
            if state.has_active_run(thread_id) {
                return Err(PlatformError::invalid_request(format!(
                    "Can't add messages to {} while a run is active",
                    thread_id
                )));
            }
            state.push_message(thread_id, role, content, None)
        })
    }

    async fn list_messages(&self, thread_id: &ThreadId) -> PlatformResult<Vec<ThreadMessage>> {
        self.intercept(Operation::ListMessages, |state| {
            Ok(state.thread_messages(thread_id)?.clone())
        })
    }

    async fn create_run(&self, thread_id: &ThreadId, agent_id: &AgentId) -> PlatformResult<Run> {
        self.intercept(Operation::CreateRun, |state| {
            state.thread_messages(thread_id)?;
            if !state.agents.contains_key(agent_id) {
                return Err(PlatformError::not_found(format!("assistants/{}", agent_id)));
            }
            if state.has_active_run(thread_id) {
                return Err(PlatformError::conflict(format!(
                    "Thread {} already has an active run",
                    thread_id
                )));
            }

            let script = match state.scripts.pop_front() {
                Some(script) => script,
                None => state.fallback.clone().unwrap_or_else(RunScript::echo),
            };
            let run = Run {
                id: RunId::new_unchecked(state.next_id("run")),
                thread_id: thread_id.clone(),
                agent_id: agent_id.clone(),
                status: RunStatus::Queued,
                required_action: None,
                last_error: None,
            };
            state.runs.insert(
                run.id.clone(),
                RunState {
                    run: run.clone(),
                    steps: script.steps.into(),
                    reply: script.reply,
                    replied: false,
                    awaiting_outputs: false,
                    advance_on_submit: script.advance_on_submit,
                },
            );
            Ok(run)
        })
    }

    async fn get_run(&self, thread_id: &ThreadId, run_id: &RunId) -> PlatformResult<Run> {
        self.intercept(Operation::GetRun, |state| {
            state.run_state(thread_id, run_id)?;
            state.advance(run_id)
        })
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &ThreadId,
        run_id: &RunId,
        outputs: &[ToolOutput],
    ) -> PlatformResult<Run> {
        self.intercept(Operation::SubmitToolOutputs, |state| {
            let run_state = state.run_state(thread_id, run_id)?;
            if !run_state.awaiting_outputs {
                return Err(PlatformError::invalid_request(format!(
                    "Runs in status \"{}\" do not accept tool outputs",
                    run_state.run.status
                )));
            }

            let pending: HashSet<&ToolCallId> = run_state
                .run
                .pending_tool_calls()
                .iter()
                .map(|call| &call.id)
                .collect();
            let submitted: HashSet<&ToolCallId> =
                outputs.iter().map(|output| &output.tool_call_id).collect();
            if pending != submitted || outputs.len() != pending.len() {
                return Err(PlatformError::invalid_request(
                    "Tool outputs must match the pending tool calls exactly",
                ));
            }

            run_state.awaiting_outputs = false;
            run_state.run.status = RunStatus::InProgress;
            run_state.run.required_action = None;
            let advance = run_state.advance_on_submit;
            let run = run_state.run.clone();
            state.submissions.push((run_id.clone(), outputs.to_vec()));
            if advance {
                return state.advance(run_id);
            }
            Ok(run)
        })
    }

    async fn cancel_run(&self, thread_id: &ThreadId, run_id: &RunId) -> PlatformResult<Run> {
        self.intercept(Operation::CancelRun, |state| {
            let run_state = state.run_state(thread_id, run_id)?;
            if run_state.run.status.is_terminal() {
                return Err(PlatformError::invalid_request(format!(
                    "Cannot cancel run with status \"{}\"",
                    run_state.run.status
                )));
            }

            run_state.run.status = RunStatus::Cancelled;
            run_state.run.required_action = None;
            run_state.awaiting_outputs = false;
            run_state.steps.clear();
            let run = run_state.run.clone();
            state.cancelled.push(run_id.clone());
            Ok(run)
        })
    }
}
