pub mod memory;
pub mod run;
pub mod status;
pub mod wake;

use automaton_config::{AutomatonConfig, expand_home};
use automaton_core::identity::AutomatonIdentity;
use automaton_state::SqliteDatabase;
use std::sync::Arc;

/// Open the durable store at `config.db_path`, creating its directory.
pub async fn open_database(config: &AutomatonConfig) -> Result<Arc<SqliteDatabase>, Box<dyn std::error::Error>> {
    let path = expand_home(&config.db_path);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let db = SqliteDatabase::new(&format!("sqlite://{}", path.display())).await?;
    Ok(Arc::new(db))
}

pub fn build_identity(config: &AutomatonConfig) -> AutomatonIdentity {
    let identity = AutomatonIdentity::new(&config.name, &config.address)
        .with_creator(&config.creator_address)
        .with_sandbox(&config.sandbox_id);
    match &config.api_key {
        Some(key) => identity.with_api_key(key),
        None => identity,
    }
}
