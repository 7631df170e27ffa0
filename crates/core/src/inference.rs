//! Reasoning backend trait: send a prompt, get a decision back.
//!
//! Implementations (OpenAI-compatible HTTP, scripted test doubles) live
//! outside this crate.

use crate::action::ActionDefinition;
use crate::error::InferenceError;
use crate::message::{ChatMessage, MessageToolCall};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct InferenceOptions {
    /// Overrides the backend's current model
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Actions the model may request
    pub actions: Vec<ActionDefinition>,
}

/// Token accounting for one reasoning call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    pub fn from_api(reason: &str) -> Self {
        match reason {
            "stop" => Self::Stop,
            "tool_calls" | "function_call" => Self::ToolCalls,
            "length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A decision from the reasoning backend.
#[derive(Debug, Clone)]
pub struct InferenceResponse {
    pub id: String,
    pub model: String,
    /// The assistant's text
    pub content: String,
    pub tool_calls: Vec<MessageToolCall>,
    pub usage: TokenUsage,
    pub finish_reason: FinishReason,
}

impl InferenceResponse {
    /// Render as an assistant chat message.
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::assistant(self.content.clone()).with_tool_calls(self.tool_calls.clone())
    }
}

/// The core reasoning backend trait.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Send a prompt and get a decision.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: InferenceOptions,
    ) -> Result<InferenceResponse, InferenceError>;

    /// Switch to (or away from) the backend's cheap model.
    fn set_low_compute_mode(&self, enabled: bool);

    /// The model that the next call will use.
    fn default_model(&self) -> String;
}
