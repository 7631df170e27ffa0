//! Local execution backend: the host shell, a working directory, and a
//! credit budget taken from configuration.

use async_trait::async_trait;
use automaton_config::{AutomatonConfig, expand_home};
use automaton_core::error::SandboxError;
use automaton_core::sandbox::{ExecResult, ExecutionBackend};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub struct LocalSandbox {
    workdir: PathBuf,
    credits_cents: AtomicI64,
    default_timeout: Duration,
}

impl LocalSandbox {
    pub fn new(workdir: impl Into<PathBuf>, credits_cents: i64) -> Self {
        Self {
            workdir: workdir.into(),
            credits_cents: AtomicI64::new(credits_cents),
            default_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &AutomatonConfig) -> Self {
        Self::new(expand_home(&config.sandbox.workdir), config.sandbox.credits_cents)
            .with_default_timeout(Duration::from_secs(config.sandbox.command_timeout_secs))
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Create the working directory if needed.
    pub async fn prepare(&self) -> Result<(), SandboxError> {
        tokio::fs::create_dir_all(&self.workdir)
            .await
            .map_err(|e| SandboxError::File {
                path: self.workdir.display().to_string(),
                reason: e.to_string(),
            })?;
        info!(workdir = %self.workdir.display(), "Local sandbox ready");
        Ok(())
    }

    /// Deduct spent compute from the budget. Returns the new balance.
    pub fn spend(&self, cents: u64) -> i64 {
        let cents = i64::try_from(cents).unwrap_or(i64::MAX);
        let balance = self.credits_cents.fetch_sub(cents, Ordering::Relaxed) - cents;
        debug!(spent = cents, balance, "Credits deducted");
        balance
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let expanded = expand_home(path);
        if expanded.is_absolute() {
            expanded
        } else {
            self.workdir.join(expanded)
        }
    }
}

#[async_trait]
impl ExecutionBackend for LocalSandbox {
    fn name(&self) -> &str {
        "local"
    }

    async fn exec(&self, command: &str, timeout: Option<Duration>) -> Result<ExecResult, SandboxError> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        debug!(command = %command, timeout_secs = timeout.as_secs(), "Running local command");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        cmd.current_dir(&self.workdir).kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| SandboxError::ExecFailed(e.to_string()))?,
            Err(_) => {
                warn!(command = %command, "Command timed out");
                return Err(SandboxError::Timeout {
                    timeout_secs: timeout.as_secs(),
                });
            }
        };

        Ok(ExecResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), SandboxError> {
        let target = self.resolve(path);
        let file_error = |e: std::io::Error| SandboxError::File {
            path: path.to_string(),
            reason: e.to_string(),
        };
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(file_error)?;
        }
        tokio::fs::write(&target, content).await.map_err(file_error)
    }

    async fn read_file(&self, path: &str) -> Result<String, SandboxError> {
        tokio::fs::read_to_string(self.resolve(path))
            .await
            .map_err(|e| SandboxError::File {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    async fn credits_balance(&self) -> Result<i64, SandboxError> {
        Ok(self.credits_cents.load(Ordering::Relaxed))
    }
}
