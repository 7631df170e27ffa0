//! Shared test doubles for loop tests.

use async_trait::async_trait;
use automaton_core::error::{InferenceError, SandboxError};
use automaton_core::inference::{FinishReason, InferenceClient, InferenceOptions, InferenceResponse, TokenUsage};
use automaton_core::message::{ChatMessage, MessageToolCall};
use automaton_core::sandbox::{ExecResult, ExecutionBackend};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

/// A reasoning backend that replays a script of results in order.
///
/// Once the script runs out every call fails, which the loop counts as a
/// cycle failure.
pub struct ScriptedInference {
    script: Mutex<VecDeque<Result<InferenceResponse, InferenceError>>>,
    prompts: Mutex<Vec<Vec<ChatMessage>>>,
    low_compute: AtomicBool,
}

impl ScriptedInference {
    pub fn new(responses: Vec<InferenceResponse>) -> Self {
        Self::from_results(responses.into_iter().map(Ok).collect())
    }

    pub fn from_results(results: Vec<Result<InferenceResponse, InferenceError>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            prompts: Mutex::new(Vec::new()),
            low_compute: AtomicBool::new(false),
        }
    }

    pub fn response(content: &str, tool_calls: Vec<MessageToolCall>, finish_reason: FinishReason) -> InferenceResponse {
        InferenceResponse {
            id: "resp".into(),
            model: "mock-model".into(),
            content: content.into(),
            tool_calls,
            usage: TokenUsage::new(10, 5),
            finish_reason,
        }
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<Vec<ChatMessage>> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn low_compute(&self) -> bool {
        self.low_compute.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceClient for ScriptedInference {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        _options: InferenceOptions,
    ) -> Result<InferenceResponse, InferenceError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InferenceError::InvalidResponse("script exhausted".into())))
    }

    fn set_low_compute_mode(&self, enabled: bool) {
        self.low_compute.store(enabled, Ordering::SeqCst);
    }

    fn default_model(&self) -> String {
        if self.low_compute() { "gpt-4o-mini" } else { "gpt-4o" }.into()
    }
}

/// A plain answer with no actions.
pub fn stop_response(text: &str) -> InferenceResponse {
    ScriptedInference::response(text, Vec::new(), FinishReason::Stop)
}

/// A response requesting actions.
pub fn tool_call_response(calls: Vec<MessageToolCall>, thought: &str) -> InferenceResponse {
    ScriptedInference::response(thought, calls, FinishReason::ToolCalls)
}

pub fn make_action_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// Execution backend that echoes `echo` commands and records everything.
pub struct RecordingSandbox {
    credits_cents: AtomicI64,
    commands: Mutex<Vec<String>>,
}

impl RecordingSandbox {
    pub fn with_credits(credits_cents: i64) -> Self {
        Self {
            credits_cents: AtomicI64::new(credits_cents),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Change the balance, as a top-up or a spend would.
    pub fn set_credits(&self, credits_cents: i64) {
        self.credits_cents.store(credits_cents, Ordering::SeqCst);
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionBackend for RecordingSandbox {
    fn name(&self) -> &str {
        "recording"
    }

    async fn exec(&self, command: &str, _timeout: Option<Duration>) -> Result<ExecResult, SandboxError> {
        self.commands.lock().unwrap().push(command.to_string());
        Ok(ExecResult {
            stdout: command.strip_prefix("echo ").map(|s| format!("{s}\n")).unwrap_or_default(),
            stderr: String::new(),
            exit_code: 0,
        })
    }

    async fn write_file(&self, _path: &str, _content: &str) -> Result<(), SandboxError> {
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String, SandboxError> {
        Err(SandboxError::File {
            path: path.into(),
            reason: "No such file".into(),
        })
    }

    async fn credits_balance(&self) -> Result<i64, SandboxError> {
        Ok(self.credits_cents.load(Ordering::SeqCst))
    }
}
