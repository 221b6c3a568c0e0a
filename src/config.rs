use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configured backend
pub const BACKEND_ENV: &str = "PHOENIX_BACKEND_URL";

const DEFAULT_BACKEND_URL: &str = "http://localhost:9000";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat backend (`/chat`, `/stream`, `/upload` hang off it)
    pub backend_url: String,

    /// Directory holding persisted history and preferences
    pub data_dir: PathBuf,

    /// Where the TUI writes its logs
    pub log_file: PathBuf,

    /// UI preferences
    pub ui: UiConfig,
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_timestamps: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_timestamps: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_home(&phoenix_home())
    }
}

/// `~/.phoenix`, or `./.phoenix` when there is no home directory
pub fn phoenix_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".phoenix")
}

impl Config {
    fn with_home(home: &Path) -> Self {
        Config {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            data_dir: home.join("storage"),
            log_file: home.join("phoenix.log"),
            ui: UiConfig::default(),
        }
    }

    /// Load `~/.phoenix/config.toml` and apply the environment override
    pub fn load() -> Result<Self> {
        let home = phoenix_home();
        let mut config = Self::load_from(&home)?;
        config.apply_backend_override(std::env::var(BACKEND_ENV).ok());
        Ok(config)
    }

    /// Load `config.toml` from `home`, falling back to defaults rooted there
    pub fn load_from(home: &Path) -> Result<Self> {
        fs::create_dir_all(home).context("Failed to create .phoenix directory")?;

        let config_path = home.join("config.toml");
        if !config_path.exists() {
            return Ok(Self::with_home(home));
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        let mut config: Config =
            toml::from_str(&content).context("Failed to parse config file")?;

        // Relative paths in the file are relative to the phoenix home
        if config.data_dir.is_relative() {
            config.data_dir = home.join(&config.data_dir);
        }
        if config.log_file.is_relative() {
            config.log_file = home.join(&config.log_file);
        }

        Ok(config)
    }

    /// Save configuration into `home`
    pub fn save_to(&self, home: &Path) -> Result<()> {
        fs::create_dir_all(home).context("Failed to create .phoenix directory")?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(home.join("config.toml"), content).context("Failed to write config file")?;
        Ok(())
    }

    /// Replace the backend URL when an override is present and non-blank
    pub fn apply_backend_override(&mut self, url: Option<String>) {
        if let Some(url) = url {
            let url = url.trim();
            if !url.is_empty() {
                self.backend_url = url.trim_end_matches('/').to_string();
            }
        }
    }
}
