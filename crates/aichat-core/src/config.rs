use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::models::DEFAULT_MODEL;
use crate::sse::AssemblerOptions;
use crate::sse::assembler::DEFAULT_MAX_REMERGE_ATTEMPTS;

pub const DEFAULT_CHAT_URL: &str = "https://kvuvltsvumhyeojrrjth.supabase.co/functions/v1/ai-chat";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub chat_endpoint: String,
    pub default_model: Option<String>,
    pub max_remerge_attempts: u32,
    pub flush_trailing_line: bool,
    /// Whole-request timeout. Unset means the stream may run indefinitely.
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            chat_endpoint: DEFAULT_CHAT_URL.to_string(),
            default_model: None,
            max_remerge_attempts: DEFAULT_MAX_REMERGE_ATTEMPTS,
            flush_trailing_line: false,
            request_timeout_secs: None,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_default_model(model: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.default_model = Some(model.to_string());
        config.save()
    }

    /// Replace the endpoint when an override (flag or environment) is given.
    pub fn with_endpoint_override(mut self, endpoint: Option<String>) -> Self {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            self.chat_endpoint = endpoint;
        }
        self
    }

    pub fn model(&self) -> &str {
        self.default_model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn assembler_options(&self) -> AssemblerOptions {
        AssemblerOptions {
            max_remerge_attempts: self.max_remerge_attempts,
            flush_trailing_line: self.flush_trailing_line,
        }
    }

    /// `<config dir>/aichat`, shared with the settings file.
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("aichat"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}
