//! OpenAI-compatible reasoning backend.
//!
//! Works with any endpoint exposing `/chat/completions` with function
//! calling: OpenAI, OpenRouter, Ollama, vLLM, Together AI and friends.
//! The client holds two models and switches to the cheaper one while the
//! agent is in low-compute mode.

use async_trait::async_trait;
use automaton_config::AutomatonConfig;
use automaton_core::action::ActionDefinition;
use automaton_core::error::InferenceError;
use automaton_core::inference::{FinishReason, InferenceClient, InferenceOptions, InferenceResponse, TokenUsage};
use automaton_core::message::{ChatMessage, MessageToolCall, Role};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT_SECS: u64 = 120;

pub struct OpenAiCompatClient {
    base_url: String,
    api_key: String,
    model: String,
    low_compute_model: String,
    max_tokens: u32,
    low_compute: AtomicBool,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        low_compute_model: impl Into<String>,
    ) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| InferenceError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            low_compute_model: low_compute_model.into(),
            max_tokens: 4096,
            low_compute: AtomicBool::new(false),
            client,
        })
    }

    /// Build from the operating configuration. Fails without an API key.
    pub fn from_config(config: &AutomatonConfig) -> Result<Self, InferenceError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| InferenceError::NotConfigured("no API key (set AUTOMATON_API_KEY)".into()))?;

        Ok(Self::new(
            &config.api_url,
            api_key,
            &config.inference_model,
            &config.low_compute_model,
        )?
        .with_max_tokens(config.max_tokens_per_turn))
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn is_low_compute(&self) -> bool {
        self.low_compute.load(Ordering::Relaxed)
    }

    fn to_api_messages(messages: &[ChatMessage]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                    Role::Tool => "tool".into(),
                },
                content: Some(m.content.clone()),
                name: m.name.clone(),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    fn to_api_tools(actions: &[ActionDefinition]) -> Vec<ApiToolDefinition> {
        actions
            .iter()
            .map(|a| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: a.name.clone(),
                    description: a.description.clone(),
                    parameters: a.parameters.clone(),
                },
            })
            .collect()
    }

    fn build_body(&self, model: &str, messages: &[ChatMessage], options: &InferenceOptions) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": model,
            "messages": Self::to_api_messages(messages),
            "max_tokens": options.max_tokens.unwrap_or(self.max_tokens),
            "stream": false,
        });
        if let Some(temperature) = options.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if !options.actions.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&options.actions));
            body["tool_choice"] = serde_json::json!("auto");
        }
        body
    }

    fn parse_response(api_response: ApiResponse) -> Result<InferenceResponse, InferenceError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::InvalidResponse("No choices in response".into()))?;

        let tool_calls: Vec<MessageToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| MessageToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        let usage = api_response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(InferenceResponse {
            id: api_response.id.unwrap_or_default(),
            model: api_response.model,
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            usage,
            finish_reason: choice
                .finish_reason
                .as_deref()
                .map(FinishReason::from_api)
                .unwrap_or(FinishReason::Stop),
        })
    }
}

#[async_trait]
impl InferenceClient for OpenAiCompatClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: InferenceOptions,
    ) -> Result<InferenceResponse, InferenceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let model = options.model.clone().unwrap_or_else(|| self.default_model());
        let body = self.build_body(&model, messages, &options);

        debug!(model = %model, messages = messages.len(), actions = options.actions.len(), "Sending chat request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(InferenceError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(InferenceError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Inference backend returned error");
            return Err(InferenceError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        Self::parse_response(api_response)
    }

    fn set_low_compute_mode(&self, enabled: bool) {
        let previous = self.low_compute.swap(enabled, Ordering::Relaxed);
        if previous != enabled {
            info!(enabled, model = %self.default_model(), "Low-compute mode changed");
        }
    }

    fn default_model(&self) -> String {
        if self.is_low_compute() {
            self.low_compute_model.clone()
        } else {
            self.model.clone()
        }
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
