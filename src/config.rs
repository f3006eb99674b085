use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AstraConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub memory: MemoryConfig,
    pub model: ModelConfig,
    pub chat: ChatConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// Capacity, eviction, and retrieval knobs for the memory store.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    /// Hard per-user record limit.
    pub max_memories: usize,
    /// Rows removed per eviction round when a user is over the limit.
    pub delete_batch_size: usize,
    /// Decay rate (per hour) given to newly stored records.
    pub default_decay_rate: f64,
    /// Number of ranked memories fed into each model call.
    pub context_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub assistant_name: String,
    /// Delay between characters of the typing effect. 0 disables it.
    pub typing_speed_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per window. 0 disables limiting.
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_astra_dir()
            .join("memory.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_memories: 10_000,
            delete_batch_size: 100,
            default_decay_rate: 0.05,
            context_limit: 5,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: "gpt-4o".into(),
            base_url: "https://api.openai.com/v1".into(),
            max_tokens: 1500,
            temperature: 0.7,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            assistant_name: "Astra".into(),
            typing_speed_ms: 5,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 20,
            window_secs: 60,
        }
    }
}

/// Returns `~/.astra/`
pub fn default_astra_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".astra")
}

/// Returns the default config file path: `~/.astra/config.toml`
pub fn default_config_path() -> PathBuf {
    default_astra_dir().join("config.toml")
}

impl AstraConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            AstraConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (ASTRA_DB, ASTRA_LOG_LEVEL, ASTRA_MODEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ASTRA_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("ASTRA_LOG_LEVEL") {
            self.logging.log_level = val;
        }
        if let Ok(val) = std::env::var("ASTRA_MODEL") {
            self.model.model = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

/// Load `.env` from the working directory (without clobbering existing vars)
/// and return the OpenAI API key.
pub fn load_api_key() -> Result<String> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "failed to parse .env"),
    }

    let key = std::env::var("OPENAI_API_KEY")
        .context("OPENAI_API_KEY not found in environment or .env")?;
    anyhow::ensure!(!key.trim().is_empty(), "OPENAI_API_KEY is empty");
    Ok(key)
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
