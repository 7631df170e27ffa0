//! Execution backend trait: where commands actually run and where the
//! compute budget is reported from.

use crate::error::SandboxError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    async fn exec(&self, command: &str, timeout: Option<Duration>) -> Result<ExecResult, SandboxError>;

    async fn write_file(&self, path: &str, content: &str) -> Result<(), SandboxError>;

    async fn read_file(&self, path: &str) -> Result<String, SandboxError>;

    /// Remaining compute budget in cents.
    async fn credits_balance(&self) -> Result<i64, SandboxError>;

    /// On-chain balance for `address`. Backends without a wallet report zero.
    async fn usdc_balance(&self, _address: &str) -> Result<f64, SandboxError> {
        Ok(0.0)
    }
}
