//! Engine configuration.
//!
//! Taleforge reads a TOML file (`config.toml` by default) with four
//! sections: `[game]` points at the game-definition directory, `[llm]`
//! configures the generative service endpoint, `[session]` holds
//! per-playthrough knobs, and `[logging]` sets the default log level.
//! Every field has a sensible default so a missing section never blocks
//! startup; validation catches the values that would.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Where the game definition lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Directory containing game.toml and the JSON tables.
    pub dir: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            dir: "data/game".to_string(),
        }
    }
}

/// Generative service endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// When false the engine runs fully offline on its fallback paths.
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    /// Per-request timeout. A slow endpoint degrades to fallback, so
    /// this is the most a single turn can stall.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: crate::llm::ollama::DEFAULT_BASE_URL.to_string(),
            model: crate::llm::ollama::DEFAULT_MODEL.to_string(),
            timeout_secs: crate::llm::ollama::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Per-session settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// Fixed RNG seed for reproducible playthroughs. Unset seeds from
    /// the OS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
}

/// Logging defaults; `RUST_LOG` and `-v` flags override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and validate a configuration file.
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("cannot read config '{}': {}", path, e))?;
        let config: Config =
            toml::from_str(&contents).map_err(|e| anyhow!("cannot parse '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Write a default configuration, refusing to clobber an existing
    /// file.
    pub async fn create_default(path: &str) -> Result<()> {
        if fs::try_exists(path).await.unwrap_or(false) {
            return Err(anyhow!("'{}' already exists; not overwriting", path));
        }
        let config = Config::default();
        let text = toml::to_string_pretty(&config)?;
        fs::write(path, text).await?;
        Ok(())
    }

    /// Sanity checks on loaded values.
    pub fn validate(&self) -> Result<()> {
        if self.game.dir.trim().is_empty() {
            return Err(anyhow!("[game] dir must not be empty"));
        }
        if self.llm.enabled {
            if self.llm.base_url.trim().is_empty() {
                return Err(anyhow!("[llm] base_url must not be empty when enabled"));
            }
            if self.llm.timeout_secs == 0 {
                return Err(anyhow!("[llm] timeout_secs must be at least 1"));
            }
        }
        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            other => Err(anyhow!(
                "[logging] level '{}' is not one of error/warn/info/debug/trace",
                other
            )),
        }
    }
}
