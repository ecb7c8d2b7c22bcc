//! Configuration file parser for ~/.config/quire/config.toml.
//!
//! The file is optional; a missing or blank file yields `Config::default()`.
//! Unknown keys are accepted but logged, since they are usually typos.
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding `api_url`.
pub const API_URL_ENV: &str = "QUIRE_API_URL";

pub const DEFAULT_API_URL: &str = "http://localhost:3001";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base address of the blog data service.
    pub api_url: String,

    /// Initial theme variant ("dark" or "light"). A saved choice wins.
    pub theme: String,

    /// Minutes a fetched list or post is served without refetching.
    pub stale_minutes: u64,

    pub request_timeout_secs: u64,

    /// Quiet period before typed search text is applied.
    pub search_debounce_ms: u64,

    /// Maximum number of cached single-post lookups.
    pub cache_capacity: usize,

    /// Keybinding overrides: action name to key string.
    pub keybindings: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            theme: "dark".to_string(),
            stale_minutes: 5,
            request_timeout_secs: 30,
            search_debounce_ms: 300,
            cache_capacity: 64,
            keybindings: HashMap::new(),
        }
    }
}

impl Config {
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "api_url",
        "theme",
        "stale_minutes",
        "request_timeout_secs",
        "search_debounce_ms",
        "cache_capacity",
        "keybindings",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing or whitespace-only file → defaults
    /// - Over 1 MiB → `ConfigError::TooLarge`
    /// - Invalid TOML or wrong value types → `ConfigError::Parse`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            api_url = %config.api_url,
            theme = %config.theme,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Apply the base address overrides: flag, then environment, then file.
    pub fn with_api_url_override(mut self, flag: Option<&str>, env: Option<String>) -> Self {
        if let Some(url) = flag {
            self.api_url = url.to_string();
        } else if let Some(url) = env.filter(|u| !u.trim().is_empty()) {
            self.api_url = url;
        }
        self
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_minutes.saturating_mul(60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

// ============================================================================
// Tests
// ============================================================================
