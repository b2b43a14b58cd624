use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, env, fs, path::PathBuf, time::Duration};

use crate::provider::ServiceId;

/// Placeholder key shipped in sample configs; treated as "no key".
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

/// Environment variable that overrides the OpenWeather key from the file.
pub const OPENWEATHER_KEY_ENV: &str = "CITYLYTICS_OPENWEATHER_KEY";

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 15 * 60;
pub const DEFAULT_MAX_DATA_POINTS: usize = 30;
pub const DEFAULT_USER_AGENT: &str = "CityLyticsDashboard/1.0";

/// Per-service settings (API key and/or endpoint override).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// City looked up on startup when none is given on the command line.
    pub default_city: Option<String>,

    pub refresh_interval_secs: u64,

    /// Capacity of the pollution time series.
    pub max_data_points: usize,

    /// Sent as `User-Agent` to the geocoder, which requires an identifying client.
    pub user_agent: String,

    /// Example TOML:
    /// [services.openweather]
    /// api_key = "..."
    pub services: HashMap<String, ServiceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_city: None,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            max_data_points: DEFAULT_MAX_DATA_POINTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            services: HashMap::new(),
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "citylytics", "citylytics")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn service(&self, id: ServiceId) -> Option<&ServiceConfig> {
        self.services.get(id.as_str())
    }

    pub fn base_url(&self, id: ServiceId) -> Option<&str> {
        self.service(id).and_then(|s| s.base_url.as_deref())
    }

    /// Set or replace the API key for a service.
    pub fn upsert_api_key(&mut self, id: ServiceId, api_key: String) {
        self.services.entry(id.as_str().to_string()).or_default().api_key = Some(api_key);
    }

    /// Returns a usable API key for a service: the environment override for
    /// OpenWeather first, then the file. Blank and placeholder keys count as absent.
    pub fn api_key(&self, id: ServiceId) -> Option<String> {
        let from_env = match id {
            ServiceId::OpenWeather => env::var(OPENWEATHER_KEY_ENV).ok(),
            _ => None,
        };

        from_env
            .filter(|k| api_key_is_usable(k))
            .or_else(|| {
                self.service(id)
                    .and_then(|s| s.api_key.clone())
                    .filter(|k| api_key_is_usable(k))
            })
    }

    pub fn is_service_configured(&self, id: ServiceId) -> bool {
        !id.requires_api_key() || self.api_key(id).is_some()
    }
}

pub fn api_key_is_usable(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key != PLACEHOLDER_API_KEY
}
