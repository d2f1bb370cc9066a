//! Store wiring shared by the CLI commands.

use roost_config::AppConfig;
use roost_core::memory::MemoryStore;
use roost_memory::{InMemoryStore, PgMemoryStore, SqliteDirectory, SqliteMemoryStore};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Open the configured memory store.
pub async fn open_memory_store(config: &AppConfig) -> CliResult<Arc<dyn MemoryStore>> {
    match config.database.backend.as_str() {
        "sqlite" => {
            std::fs::create_dir_all(AppConfig::config_dir())?;
            let store = SqliteMemoryStore::new(&config.database.sqlite_path()).await?;
            Ok(Arc::new(store))
        }
        "postgres" => {
            let url = config
                .database
                .url
                .as_deref()
                .ok_or("postgres backend requires database.url")?;
            Ok(Arc::new(PgMemoryStore::connect(url).await?))
        }
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        other => Err(format!("unknown database backend '{other}'").into()),
    }
}

/// Open the sqlite pool plus store and directory on top of it.
///
/// Profiles and tasks live in the sqlite database, so the prompt and
/// agent commands require the sqlite backend.
pub async fn open_sqlite_stack(
    config: &AppConfig,
) -> CliResult<(Arc<SqliteMemoryStore>, Arc<SqliteDirectory>)> {
    if config.database.backend != "sqlite" {
        return Err(format!(
            "this command requires the sqlite backend (configured: '{}')",
            config.database.backend
        )
        .into());
    }

    std::fs::create_dir_all(AppConfig::config_dir())?;
    let pool = sqlite_pool(&config.database.sqlite_path()).await?;
    let store = SqliteMemoryStore::from_pool(pool.clone()).await?;
    let directory = SqliteDirectory::from_pool(pool).await?;
    Ok((Arc::new(store), Arc::new(directory)))
}

async fn sqlite_pool(path: &str) -> CliResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(path)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;
    Ok(pool)
}
