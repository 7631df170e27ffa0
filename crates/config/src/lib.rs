//! Configuration loading, validation, and management for the automaton.
//!
//! Loads configuration from `~/.automaton/automaton.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name inside the config directory.
pub const CONFIG_FILE: &str = "automaton.toml";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// The root configuration structure.
///
/// Maps directly to `~/.automaton/automaton.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AutomatonConfig {
    /// Display name of the automaton
    #[serde(default = "default_name")]
    pub name: String,

    /// Founding instruction shown on the very first wake
    #[serde(default = "default_genesis_prompt")]
    pub genesis_prompt: String,

    /// Optional note from the creator, shown once alongside the genesis prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_message: Option<String>,

    #[serde(default)]
    pub creator_address: String,

    /// The automaton's own address; also scopes memory sessions
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_sandbox_id")]
    pub sandbox_id: String,

    /// Reasoning backend API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_inference_model")]
    pub inference_model: String,

    /// Model used while in low-compute or critical tiers
    #[serde(default = "default_low_compute_model")]
    pub low_compute_model: String,

    #[serde(default = "default_max_tokens_per_turn")]
    pub max_tokens_per_turn: u32,

    /// Durable store location (SQLite)
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default, rename = "loop")]
    pub loop_config: LoopConfig,

    #[serde(default)]
    pub sandbox: SandboxConfig,

    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

fn default_name() -> String {
    "automaton".into()
}
fn default_genesis_prompt() -> String {
    "You are a sovereign automaton. Survive, earn your compute, and create value.".into()
}
fn default_address() -> String {
    "0x0000000000000000000000000000000000000000".into()
}
fn default_sandbox_id() -> String {
    "local".into()
}
fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_inference_model() -> String {
    "gpt-4o".into()
}
fn default_low_compute_model() -> String {
    "gpt-4o-mini".into()
}
fn default_max_tokens_per_turn() -> u32 {
    4096
}
fn default_db_path() -> String {
    "~/.automaton/state.db".into()
}
fn default_log_level() -> String {
    "info".into()
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AutomatonConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomatonConfig")
            .field("name", &self.name)
            .field("creator_address", &self.creator_address)
            .field("address", &self.address)
            .field("sandbox_id", &self.sandbox_id)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("inference_model", &self.inference_model)
            .field("low_compute_model", &self.low_compute_model)
            .field("max_tokens_per_turn", &self.max_tokens_per_turn)
            .field("db_path", &self.db_path)
            .field("log_level", &self.log_level)
            .field("memory", &self.memory)
            .field("loop", &self.loop_config)
            .field("sandbox", &self.sandbox)
            .field("heartbeat", &self.heartbeat)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Provider name: "legacy" or "session"
    #[serde(default = "default_memory_provider")]
    pub provider: String,

    /// Where the session provider keeps its messages
    #[serde(default = "default_memory_storage_path")]
    pub storage_path: String,

    #[serde(default = "default_true")]
    pub semantic_recall: bool,

    /// Messages recalled from the end of the session
    #[serde(default = "default_last_messages")]
    pub last_messages: usize,

    /// Nearest neighbours fetched for a recall hint
    #[serde(default = "default_semantic_top_k")]
    pub semantic_top_k: usize,
}

fn default_memory_provider() -> String {
    "legacy".into()
}
fn default_memory_storage_path() -> String {
    "~/.automaton/memory.db".into()
}
fn default_last_messages() -> usize {
    40
}
fn default_semantic_top_k() -> usize {
    5
}
fn default_true() -> bool {
    true
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            provider: default_memory_provider(),
            storage_path: default_memory_storage_path(),
            semantic_recall: true,
            last_messages: default_last_messages(),
            semantic_top_k: default_semantic_top_k(),
        }
    }
}

/// Agent loop limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    #[serde(default = "default_max_actions_per_turn")]
    pub max_actions_per_turn: usize,

    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,

    /// Sleep after a turn that requested nothing
    #[serde(default = "default_idle_sleep_secs")]
    pub idle_sleep_secs: u64,

    /// Sleep after too many consecutive failures
    #[serde(default = "default_error_sleep_secs")]
    pub error_sleep_secs: u64,

    /// Inbox messages folded into one pending input
    #[serde(default = "default_inbox_batch")]
    pub inbox_batch: usize,
}

fn default_max_actions_per_turn() -> usize {
    10
}
fn default_max_consecutive_errors() -> u32 {
    5
}
fn default_idle_sleep_secs() -> u64 {
    60
}
fn default_error_sleep_secs() -> u64 {
    300
}
fn default_inbox_batch() -> usize {
    5
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_actions_per_turn: default_max_actions_per_turn(),
            max_consecutive_errors: default_max_consecutive_errors(),
            idle_sleep_secs: default_idle_sleep_secs(),
            error_sleep_secs: default_error_sleep_secs(),
            inbox_batch: default_inbox_batch(),
        }
    }
}

/// Local execution backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_workdir")]
    pub workdir: String,

    /// Compute budget reported by the local backend
    #[serde(default = "default_credits_cents")]
    pub credits_cents: i64,

    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

fn default_workdir() -> String {
    "~/.automaton/workspace".into()
}
fn default_credits_cents() -> i64 {
    1000
}
fn default_command_timeout_secs() -> u64 {
    30
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            credits_cents: default_credits_cents(),
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_heartbeat_interval")]
    pub interval_secs: u64,
}

fn default_heartbeat_interval() -> u64 {
    300
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_heartbeat_interval(),
        }
    }
}

impl AutomatonConfig {
    /// Load configuration from the default path (~/.automaton/automaton.toml).
    ///
    /// Environment overrides:
    /// - `AUTOMATON_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `AUTOMATON_MODEL`
    /// - `AUTOMATON_API_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join(CONFIG_FILE);
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("AUTOMATON_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(model) = lookup("AUTOMATON_MODEL") {
            self.inference_model = model;
        }
        if let Some(url) = lookup("AUTOMATON_API_URL") {
            self.api_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".automaton")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationError("name must not be empty".into()));
        }
        if self.max_tokens_per_turn == 0 {
            return Err(ConfigError::ValidationError(
                "max_tokens_per_turn must be > 0".into(),
            ));
        }
        if self.loop_config.max_actions_per_turn == 0
            || self.loop_config.max_consecutive_errors == 0
            || self.loop_config.inbox_batch == 0
        {
            return Err(ConfigError::ValidationError(
                "loop limits must be > 0".into(),
            ));
        }
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AutomatonConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            genesis_prompt: default_genesis_prompt(),
            creator_message: None,
            creator_address: String::new(),
            address: default_address(),
            sandbox_id: default_sandbox_id(),
            api_key: None,
            api_url: default_api_url(),
            inference_model: default_inference_model(),
            low_compute_model: default_low_compute_model(),
            max_tokens_per_turn: default_max_tokens_per_turn(),
            db_path: default_db_path(),
            log_level: default_log_level(),
            memory: MemoryConfig::default(),
            loop_config: LoopConfig::default(),
            sandbox: SandboxConfig::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs_home().join(rest),
        None if path == "~" => dirs_home(),
        None => PathBuf::from(path),
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
