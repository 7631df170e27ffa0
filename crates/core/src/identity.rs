//! Automaton identity: who the agent is and who created it.
//!
//! Built once by the CLI at startup and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The agent's identity for the lifetime of the process.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomatonIdentity {
    /// Display name
    pub name: String,

    /// Wallet-style address; also the resource id for memory sessions
    pub address: String,

    /// Address of the creator who funded this automaton
    pub creator_address: String,

    /// Execution environment identifier
    pub sandbox_id: String,

    /// Credential for the hosting platform
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl AutomatonIdentity {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            creator_address: String::new(),
            sandbox_id: String::new(),
            api_key: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_creator(mut self, creator_address: impl Into<String>) -> Self {
        self.creator_address = creator_address.into();
        self
    }

    pub fn with_sandbox(mut self, sandbox_id: impl Into<String>) -> Self {
        self.sandbox_id = sandbox_id.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

impl std::fmt::Debug for AutomatonIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomatonIdentity")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("creator_address", &self.creator_address)
            .field("sandbox_id", &self.sandbox_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_api_key() {
        let id = AutomatonIdentity::new("ada", "0xabc").with_api_key("sk-secret");
        let out = format!("{id:?}");
        assert!(!out.contains("sk-secret"));
        assert!(out.contains("***"));
    }

    #[test]
    fn api_key_never_serialized() {
        let id = AutomatonIdentity::new("ada", "0xabc").with_api_key("sk-secret");
        let json = serde_json::to_string(&id).unwrap();
        assert!(!json.contains("sk-secret"));
        assert!(json.contains("creatorAddress"));
    }
}
