//! Application configuration

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const CONFIG_FILENAME: &str = "reel.json";

/// Main application configuration, persisted as JSON in the data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Config schema version
    pub version: u32,

    /// Data directory path
    pub data_dir: PathBuf,

    /// Logging level
    pub log_level: String,

    /// Base URL under which uploaded media is publicly reachable
    pub public_base_url: String,

    /// Whether a session is withheld until the email is confirmed
    pub require_email_confirmation: bool,

    /// Template for generated avatar URLs; `{username}` is substituted
    pub avatar_url_template: String,
}

impl AppConfig {
    /// Load configuration from a data directory, creating a default one
    /// when no config file exists yet.
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILENAME);

        if config_path.exists() {
            info!("Loading config from {:?}", config_path);
            let json = fs::read_to_string(&config_path)?;
            let config: AppConfig = serde_json::from_str(&json)?;
            Ok(config)
        } else {
            warn!("No config found, creating default at {:?}", config_path);
            let config = Self::default_with_dir(data_dir.to_path_buf());
            config.save()?;
            Ok(config)
        }
    }

    /// Create default configuration with a specific data directory
    pub fn default_with_dir(data_dir: PathBuf) -> Self {
        Self {
            version: Self::target_version(),
            data_dir,
            log_level: "info".to_string(),
            public_base_url: "http://localhost:8000".to_string(),
            require_email_confirmation: true,
            avatar_url_template: "https://ui-avatars.com/api/?name={username}&background=random"
                .to_string(),
        }
    }

    /// Save configuration to its data directory
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let config_path = self.data_dir.join(CONFIG_FILENAME);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, json)?;
        Ok(())
    }

    fn target_version() -> u32 {
        1
    }
}
