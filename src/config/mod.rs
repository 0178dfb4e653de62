//! Configuration management.
//!
//! Configuration is read from `~/.config/skylight/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! The access token may also come from the `SKYLIGHT_ACCESS_TOKEN` environment
//! variable, which takes precedence over the file.

pub mod settings;

pub use settings::{SettingsHandle, SettingsObserver, TimelineSettings, MIN_FETCH_INTERVAL_SECS};

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

pub const ACCESS_TOKEN_ENV: &str = "SKYLIGHT_ACCESS_TOKEN";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub timeline: TimelineConfig,
}

/// Which service to talk to and as whom.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub handle: String,
    pub access_token: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://bsky.social".to_string(),
            handle: String::new(),
            access_token: String::new(),
        }
    }
}

/// Timeline fetch behavior. Values outside their valid ranges are clamped
/// at use, not rejected here.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub auto_fetch: bool,
    pub fetch_interval: u64,
    pub fetch_count: usize,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            auto_fetch: true,
            fetch_interval: 600,
            fetch_count: 50,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::apply_env(Self::default()));
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(Self::apply_env(config))
    }

    /// Get the default config file path: `~/.config/skylight/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("skylight").join("config.toml"))
    }

    fn apply_env(mut config: Config) -> Config {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.is_empty() {
                config.service.access_token = token;
            }
        }
        config
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let default_config = Self::default_config_content();

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(default_config.as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Skylight Configuration

[service]
# Base URL of the Bluesky-compatible service.
base_url = "https://bsky.social"

# Your account handle, e.g. "alice.bsky.social".
handle = ""

# Access token for the session. May be left empty and provided via the
# SKYLIGHT_ACCESS_TOKEN environment variable instead.
access_token = ""

[timeline]
# Fetch the timeline periodically in watch mode.
auto_fetch = true

# Seconds between automatic fetches. Values below 180 are raised to 180.
fetch_interval = 600

# Posts per fetch, between 1 and 100.
fetch_count = 50
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
