use crate::apod::{APOD_ENDPOINT, DEMO_KEY};
use crate::utils::{get_config_dir, get_program_dir};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::{read_to_string, write};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ApodConfig {
    #[serde(default = "get_program_dir")]
    pub cache_parent: PathBuf,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_set_wallpaper")]
    pub set_wallpaper: bool,
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_endpoint() -> String {
    APOD_ENDPOINT.to_string()
}

fn default_set_wallpaper() -> bool {
    true
}

fn default_theme() -> String {
    "Dark".to_string()
}

impl Default for ApodConfig {
    fn default() -> Self {
        Self {
            cache_parent: get_program_dir(),
            api_key: None,
            endpoint: default_endpoint(),
            set_wallpaper: default_set_wallpaper(),
            theme: default_theme(),
        }
    }
}

impl ApodConfig {
    pub fn load_or_default() -> Result<Self> {
        Self::load_or_default_from(&get_config_dir()?.join("config.json"))
    }

    pub fn load_or_default_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = read_to_string(config_path)?;
            let config: Self =
                serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_dir()?.join("config.json"))
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        write(config_path, content)?;
        Ok(())
    }

    /// API key from the config file, then `NASA_API_KEY`, then the public demo key.
    pub fn effective_api_key(&self) -> String {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("NASA_API_KEY").ok())
            .unwrap_or_else(|| DEMO_KEY.to_string())
    }
}
