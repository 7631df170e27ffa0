//! Build memory providers by configured name.

use crate::embedding::HashEmbedder;
use crate::in_memory::InMemoryMessageStore;
use crate::message_store::MessageStore;
use crate::pass_through::PassThroughMemory;
use crate::session::{SessionMemory, SessionSettings};
use automaton_config::{AutomatonConfig, expand_home};
use automaton_core::error::MemoryError;
use automaton_core::memory::MemoryProvider;
use automaton_core::store::AutomatonDatabase;
use std::sync::Arc;
use tracing::info;

const PROVIDERS: &[&str] = &["legacy", "session"];

/// Names accepted by [`create_memory_provider`].
pub fn available_providers() -> Vec<&'static str> {
    PROVIDERS.to_vec()
}

/// Create the provider called `name`.
///
/// `legacy` reads through to `db`. `session` keeps its own message store at
/// `memory.storage_path` (`:memory:` keeps it in process).
pub async fn create_memory_provider(
    name: &str,
    config: &AutomatonConfig,
    db: Arc<dyn AutomatonDatabase>,
) -> Result<Arc<dyn MemoryProvider>, MemoryError> {
    match name {
        "legacy" => Ok(Arc::new(PassThroughMemory::new(db))),
        "session" => {
            let store = open_message_store(&config.memory.storage_path).await?;
            let settings = SessionSettings {
                last_messages: config.memory.last_messages,
                semantic_recall: config.memory.semantic_recall,
                semantic_top_k: config.memory.semantic_top_k,
                ..SessionSettings::default()
            };
            let memory = SessionMemory::new(store, settings).with_embedder(Arc::new(HashEmbedder::default()));
            Ok(Arc::new(memory))
        }
        other => Err(MemoryError::UnknownProvider {
            name: other.to_string(),
            available: PROVIDERS.join(", "),
        }),
    }
}

async fn open_message_store(storage_path: &str) -> Result<Arc<dyn MessageStore>, MemoryError> {
    if storage_path == ":memory:" {
        return Ok(Arc::new(InMemoryMessageStore::new()));
    }

    #[cfg(feature = "sqlite")]
    {
        let path = expand_home(storage_path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MemoryError::Storage(format!("Cannot create {}: {e}", parent.display())))?;
        }
        info!(path = %path.display(), "Opening session message store");
        let store = crate::sqlite::SqliteMessageStore::new(&format!("sqlite://{}", path.display())).await?;
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "sqlite"))]
    {
        info!(
            ignored_path = %expand_home(storage_path).display(),
            "SQLite disabled, session messages kept in memory"
        );
        Ok(Arc::new(InMemoryMessageStore::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automaton_state::InMemoryDatabase;

    fn db() -> Arc<dyn AutomatonDatabase> {
        Arc::new(InMemoryDatabase::new())
    }

    #[tokio::test]
    async fn creates_legacy_by_default() {
        let config = AutomatonConfig::default();
        let memory = create_memory_provider(&config.memory.provider, &config, db()).await.unwrap();
        assert_eq!(memory.name(), "legacy");
    }

    #[tokio::test]
    async fn creates_in_process_session_provider() {
        let mut config = AutomatonConfig::default();
        config.memory.storage_path = ":memory:".into();
        let memory = create_memory_provider("session", &config, db()).await.unwrap();
        assert_eq!(memory.name(), "session");
    }

    #[tokio::test]
    async fn creates_sqlite_session_provider() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AutomatonConfig::default();
        config.memory.storage_path = dir.path().join("nested/memory.db").display().to_string();
        let memory = create_memory_provider("session", &config, db()).await.unwrap();
        memory.init().await.unwrap();
        assert!(dir.path().join("nested/memory.db").exists());
    }

    #[tokio::test]
    async fn unknown_provider_lists_names() {
        let config = AutomatonConfig::default();
        let err = match create_memory_provider("redis", &config, db()).await {
            Err(e) => e.to_string(),
            Ok(_) => panic!("expected unknown provider error"),
        };
        assert!(err.contains("redis"));
        assert!(err.contains("legacy, session"));
    }

    #[test]
    fn lists_available_providers() {
        assert_eq!(available_providers(), ["legacy", "session"]);
    }
}
