//! # Mock Tools for Testing
//!
//! Mock tool implementations that return predictable responses and record
//! how they were called.

use runbridge_core::{ExecutionResult, Tool};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
enum MockBehavior {
    Respond(ExecutionResult),
    Panic(String),
}

/// A mock tool that returns predefined responses based on its arguments
#[derive(Debug, Clone)]
pub struct MockTool {
    name: String,
    responses: Vec<(serde_json::Value, ExecutionResult)>,
    default_behavior: Option<MockBehavior>,
    call_history: Arc<Mutex<Vec<serde_json::Value>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTool {
    /// Create a new mock tool with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Vec::new(),
            default_behavior: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response for specific arguments
    pub fn with_response(mut self, arguments: serde_json::Value, response: impl Into<String>) -> Self {
        self.responses
            .push((arguments, ExecutionResult::success(response)));
        self
    }

    /// Add a failure response for specific arguments
    pub fn with_failure(mut self, arguments: serde_json::Value, error: impl Into<String>) -> Self {
        self.responses
            .push((arguments, ExecutionResult::failure(error)));
        self
    }

    /// Set a default response for any unmatched arguments
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_behavior = Some(MockBehavior::Respond(ExecutionResult::success(response)));
        self
    }

    /// Set a default failure response for any unmatched arguments
    pub fn with_default_failure(mut self, error: impl Into<String>) -> Self {
        self.default_behavior = Some(MockBehavior::Respond(ExecutionResult::failure(error)));
        self
    }

    /// Panic on any unmatched arguments
    pub fn with_default_panic(mut self, message: impl Into<String>) -> Self {
        self.default_behavior = Some(MockBehavior::Panic(message.into()));
        self
    }

    /// Get the number of times this tool has been called
    pub fn call_count(&self) -> usize {
        lock(&self.call_history).len()
    }

    /// Get the history of arguments passed to this tool
    pub fn call_history(&self) -> Vec<serde_json::Value> {
        lock(&self.call_history).clone()
    }

    /// Check if the tool was called with specific arguments
    pub fn was_called_with(&self, arguments: &serde_json::Value) -> bool {
        lock(&self.call_history).contains(arguments)
    }

    /// Reset call history
    pub fn reset(&self) {
        lock(&self.call_history).clear();
    }
}

impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Mock tool"
    }

    fn call(&self, arguments: serde_json::Value) -> ExecutionResult {
        lock(&self.call_history).push(arguments.clone());

        if let Some((_, response)) = self.responses.iter().find(|(a, _)| *a == arguments) {
            return response.clone();
        }

        match &self.default_behavior {
            Some(MockBehavior::Respond(result)) => result.clone(),
            Some(MockBehavior::Panic(message)) => panic!("{}", message),
            None => ExecutionResult::success(format!("Mock response for: {}", arguments)),
        }
    }
}
