//! Configuration loading, validation, and management for Roost.
//!
//! Loads configuration from `~/.roost/config.toml` with environment
//! variable overrides. Validates all settings at load time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The root configuration structure.
///
/// Maps directly to `~/.roost/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Persistence configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Memory lifecycle configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Prompt assembly configuration
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Turn routing configuration
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            memory: MemoryConfig::default(),
            prompt: PromptConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

/// Redact connection strings (they may embed credentials) in Debug output.
fn redact(url: &Option<String>) -> &'static str {
    match url {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database", &self.database)
            .field("memory", &self.memory)
            .field("prompt", &self.prompt)
            .field("runtime", &self.runtime)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Storage backend: "sqlite", "postgres", or "memory".
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Connection URL for the postgres backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Database file name for the sqlite backend (relative names resolve
    /// inside the config directory).
    #[serde(default = "default_sqlite_file")]
    pub sqlite_file: String,
}

fn default_backend() -> String {
    "sqlite".into()
}
fn default_sqlite_file() -> String {
    "roost.sqlite".into()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: None,
            sqlite_file: default_sqlite_file(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("url", &redact(&self.url))
            .field("sqlite_file", &self.sqlite_file)
            .finish()
    }
}

impl DatabaseConfig {
    /// Resolve the sqlite connection string.
    pub fn sqlite_path(&self) -> String {
        let path = Path::new(&self.sqlite_file);
        if path.is_absolute() {
            format!("sqlite://{}", self.sqlite_file)
        } else {
            format!(
                "sqlite://{}",
                AppConfig::config_dir().join(&self.sqlite_file).display()
            )
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Records untouched for this many days lose one decay step per pass.
    #[serde(default = "default_decay_after_days")]
    pub decay_after_days: i64,

    /// Memories recalled into the prompt per turn.
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,
}

fn default_decay_after_days() -> i64 {
    30
}
fn default_recall_limit() -> usize {
    5
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            decay_after_days: default_decay_after_days(),
            recall_limit: default_recall_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Open tasks surfaced in the prompt per turn.
    #[serde(default = "default_task_limit")]
    pub task_limit: usize,
}

fn default_task_limit() -> usize {
    10
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            task_limit: default_task_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Per-strategy timeout within a turn, in seconds. 0 disables the
    /// timeout.
    #[serde(default = "default_turn_timeout_secs")]
    pub turn_timeout_secs: u64,
}

fn default_turn_timeout_secs() -> u64 {
    120
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            turn_timeout_secs: default_turn_timeout_secs(),
        }
    }
}

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Load from the default location with environment overrides.
    ///
    /// Overrides (highest priority):
    /// - `ROOST_DATABASE_BACKEND` — storage backend name
    /// - `ROOST_DATABASE_URL` — postgres connection string
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(backend) = std::env::var("ROOST_DATABASE_BACKEND") {
            config.database.backend = backend;
        }
        if let Ok(url) = std::env::var("ROOST_DATABASE_URL") {
            config.database.url = Some(url);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
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

    /// The Roost configuration directory (`~/.roost`).
    pub fn config_dir() -> PathBuf {
        home_dir().join(".roost")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.database.backend.as_str() {
            "sqlite" | "memory" => {}
            "postgres" => {
                if self.database.url.is_none() {
                    return Err(ConfigError::Invalid(
                        "postgres backend requires database.url".into(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown database backend '{other}' (expected sqlite, postgres, or memory)"
                )));
            }
        }

        if self.memory.decay_after_days < 1 {
            return Err(ConfigError::Invalid(
                "memory.decay_after_days must be at least 1".into(),
            ));
        }
        if self.memory.recall_limit == 0 {
            return Err(ConfigError::Invalid(
                "memory.recall_limit must be at least 1".into(),
            ));
        }
        if self.prompt.task_limit == 0 {
            return Err(ConfigError::Invalid(
                "prompt.task_limit must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

fn home_dir() -> PathBuf {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
    }
}
