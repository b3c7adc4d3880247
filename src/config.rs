//! Board configuration read from `.forge/board.toml`.
//!
//! Layering is file → environment → CLI. The file and environment layers
//! live here; `main.rs` applies CLI flags on top.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3141
//! db_path = ".forge/board.db"
//!
//! [ordering]
//! max_key_length = 256
//! jitter_window = 2
//! move_retry_attempts = 3
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use board_common::{DEFAULT_JITTER_WINDOW, KeyGenerator, MAX_JITTER_WINDOW, MAX_KEY_LENGTH};
use serde::{Deserialize, Serialize};

use crate::board::mover::DEFAULT_MOVE_ATTEMPTS;

pub const CONFIG_FILE_NAME: &str = "board.toml";

pub const ENV_PORT: &str = "FORGE_BOARD_PORT";
pub const ENV_DB_PATH: &str = "FORGE_BOARD_DB_PATH";
pub const ENV_MAX_KEY_LENGTH: &str = "FORGE_BOARD_MAX_KEY_LENGTH";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3141
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".forge/board.db")
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
        }
    }
}

/// Order key generation and move policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderingSection {
    /// Longest key the generator may produce
    #[serde(default = "default_max_key_length")]
    pub max_key_length: usize,
    /// Random offset applied around the middle symbol
    #[serde(default = "default_jitter_window")]
    pub jitter_window: u8,
    /// Attempts per move when another writer takes the same key
    #[serde(default = "default_move_retry_attempts")]
    pub move_retry_attempts: u32,
}

fn default_max_key_length() -> usize {
    MAX_KEY_LENGTH
}

fn default_jitter_window() -> u8 {
    DEFAULT_JITTER_WINDOW
}

fn default_move_retry_attempts() -> u32 {
    DEFAULT_MOVE_ATTEMPTS
}

impl Default for OrderingSection {
    fn default() -> Self {
        Self {
            max_key_length: default_max_key_length(),
            jitter_window: default_jitter_window(),
            move_retry_attempts: default_move_retry_attempts(),
        }
    }
}

impl OrderingSection {
    /// A randomly jittered generator honouring these settings.
    pub fn key_generator(&self) -> KeyGenerator {
        KeyGenerator::new()
            .with_max_len(self.max_key_length)
            .with_jitter_window(self.jitter_window)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub ordering: OrderingSection,
}

impl BoardToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse board.toml")
    }

    /// Load `board.toml` from `forge_dir`, or defaults if it does not exist.
    pub fn load_or_default(forge_dir: &Path) -> Result<Self> {
        let config_path = forge_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the file and environment layers. An explicit path must exist;
    /// otherwise `.forge/board.toml` is optional.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::load_or_default(Path::new(".forge"))?,
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override settings from `FORGE_BOARD_*` environment variables.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var(ENV_PORT) {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid {}: '{}'", ENV_PORT, port))?;
        }
        if let Ok(path) = std::env::var(ENV_DB_PATH) {
            self.server.db_path = PathBuf::from(path);
        }
        if let Ok(len) = std::env::var(ENV_MAX_KEY_LENGTH) {
            self.ordering.max_key_length = len
                .parse()
                .with_context(|| format!("Invalid {}: '{}'", ENV_MAX_KEY_LENGTH, len))?;
        }
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !(1..=MAX_KEY_LENGTH).contains(&self.ordering.max_key_length) {
            warnings.push(format!(
                "max_key_length {} is outside 1..={}; it will be clamped",
                self.ordering.max_key_length, MAX_KEY_LENGTH
            ));
        }
        if self.ordering.jitter_window > MAX_JITTER_WINDOW {
            warnings.push(format!(
                "jitter_window {} exceeds {}; it will be capped",
                self.ordering.jitter_window, MAX_JITTER_WINDOW
            ));
        }
        if self.ordering.move_retry_attempts == 0 {
            warnings.push(
                "move_retry_attempts is 0; moves will still be attempted once".to_string(),
            );
        }

        warnings
    }
}
