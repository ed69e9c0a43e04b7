use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::counsel::gemini::DEFAULT_GEMINI_MODEL;
use crate::models::DurationPreset;

const APP_NAME: &str = "mind-lantern";
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_PORT: u16 = 17020;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Port for the HTTP API
    pub port: u16,
    /// Session length in minutes used when no preference is stored.
    /// Must be one of the presets (5, 10, 15, 30).
    pub default_minutes: u32,
    /// Gemini model used for counsel and the daily quote
    pub gemini_model: String,
    /// Audio file looped while a meditation runs
    pub ambience_path: Option<PathBuf>,
    /// Overrides the database location in the data directory
    pub database_path: Option<PathBuf>,
    /// Gemini API key. Only ever read from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            default_minutes: DurationPreset::default().minutes(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            ambience_path: None,
            database_path: None,
            api_key: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the user's config directory, then apply
    /// environment overrides.
    /// Falls back to defaults if the file doesn't exist or fails to parse.
    pub fn load() -> Self {
        let mut config = match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.apply_env();
        config
    }

    fn try_load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;

        let config = serde_json::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save the current configuration to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// `GEMINI_API_KEY` (or `API_KEY`), `LANTERN_MODEL` and `LANTERN_PORT`.
    pub fn apply_env(&mut self) {
        self.api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());

        if let Ok(model) = std::env::var("LANTERN_MODEL") {
            if !model.trim().is_empty() {
                self.gemini_model = model;
            }
        }

        if let Some(port) = std::env::var("LANTERN_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            self.port = port;
        }
    }

    /// The configured session length, or the default preset if it isn't one.
    pub fn default_preset(&self) -> DurationPreset {
        DurationPreset::from_minutes(self.default_minutes).unwrap_or_else(|| {
            tracing::warn!(
                minutes = self.default_minutes,
                "Configured session length is not a preset"
            );
            DurationPreset::default()
        })
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
