//! Doubles shared by the action tests.

use crate::action::ActionContext;
use async_trait::async_trait;
use automaton_config::AutomatonConfig;
use automaton_core::error::{InferenceError, SandboxError, SocialError};
use automaton_core::identity::AutomatonIdentity;
use automaton_core::inference::{InferenceClient, InferenceOptions, InferenceResponse};
use automaton_core::message::ChatMessage;
use automaton_core::sandbox::{ExecResult, ExecutionBackend};
use automaton_core::social::SocialClient;
use automaton_state::InMemoryDatabase;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sandbox that records commands and keeps files in a map.
#[derive(Default)]
pub struct RecordingSandbox {
    pub commands: Mutex<Vec<String>>,
    pub files: Mutex<HashMap<String, String>>,
    pub credits_cents: i64,
    pub fail_exec: bool,
}

impl RecordingSandbox {
    pub fn with_credits(credits_cents: i64) -> Self {
        Self {
            credits_cents,
            ..Self::default()
        }
    }

    pub fn exec_count(&self) -> usize {
        self.commands.lock().unwrap().len()
    }
}

#[async_trait]
impl ExecutionBackend for RecordingSandbox {
    fn name(&self) -> &str {
        "recording"
    }

    async fn exec(&self, command: &str, _timeout: Option<Duration>) -> Result<ExecResult, SandboxError> {
        self.commands.lock().unwrap().push(command.to_string());
        if self.fail_exec {
            return Err(SandboxError::ExecFailed("sandbox offline".into()));
        }
        let stdout = command.strip_prefix("echo ").map(|s| format!("{s}\n")).unwrap_or_default();
        Ok(ExecResult {
            stdout,
            stderr: String::new(),
            exit_code: 0,
        })
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), SandboxError> {
        self.files.lock().unwrap().insert(path.into(), content.into());
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String, SandboxError> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| SandboxError::File {
                path: path.into(),
                reason: "No such file".into(),
            })
    }

    async fn credits_balance(&self) -> Result<i64, SandboxError> {
        Ok(self.credits_cents)
    }
}

/// Inference client that is never called by actions.
pub struct IdleInference;

#[async_trait]
impl InferenceClient for IdleInference {
    async fn chat(&self, _: &[ChatMessage], _: InferenceOptions) -> Result<InferenceResponse, InferenceError> {
        Err(InferenceError::NotConfigured("idle".into()))
    }

    fn set_low_compute_mode(&self, _enabled: bool) {}

    fn default_model(&self) -> String {
        "gpt-4o".into()
    }
}

/// Social client that records outgoing messages.
#[derive(Default)]
pub struct RecordingSocial {
    pub sent: Mutex<Vec<(String, String, Option<String>)>>,
}

#[async_trait]
impl SocialClient for RecordingSocial {
    async fn send(&self, to: &str, content: &str, reply_to: Option<&str>) -> Result<String, SocialError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((to.into(), content.into(), reply_to.map(String::from)));
        Ok(format!("msg-{}", sent.len()))
    }
}

pub struct Fixture {
    pub ctx: ActionContext,
    pub db: Arc<InMemoryDatabase>,
    pub sandbox: Arc<RecordingSandbox>,
}

pub fn fixture_with(sandbox: RecordingSandbox, social: Option<Arc<dyn SocialClient>>) -> Fixture {
    let db = Arc::new(InMemoryDatabase::new());
    let sandbox = Arc::new(sandbox);
    let ctx = ActionContext {
        identity: AutomatonIdentity::new("ada", "0xabc").with_creator("0xcreator"),
        config: Arc::new(AutomatonConfig::default()),
        db: db.clone(),
        inference: Arc::new(IdleInference),
        sandbox: sandbox.clone(),
        social,
    };
    Fixture { ctx, db, sandbox }
}

pub fn fixture() -> Fixture {
    fixture_with(RecordingSandbox::with_credits(500), None)
}
