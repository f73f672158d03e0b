//! Key-value settings storage and the API keys kept in it.
//!
//! The stored key names (`openaiKey`, `geminiKey`, `isConfigured`) are shared
//! with the browser extension's synced storage, so a settings file exported
//! from there can be used directly.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

pub const OPENAI_KEY: &str = "openaiKey";
pub const GEMINI_KEY: &str = "geminiKey";
pub const IS_CONFIGURED: &str = "isConfigured";

pub type Values = Map<String, Value>;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Settings file must contain a JSON object")]
    NotAnObject,

    #[error("Could not determine config directory")]
    NoConfigDir,
}

pub trait SettingsStore {
    /// Values for the requested keys. Missing keys are left out.
    fn get(&self, keys: &[&str]) -> Result<Values, SettingsError>;

    /// Merge `values` into the store.
    fn set(&mut self, values: Values) -> Result<(), SettingsError>;

    fn clear(&mut self) -> Result<(), SettingsError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemorySettingsStore {
    values: Values,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, keys: &[&str]) -> Result<Values, SettingsError> {
        Ok(pick(&self.values, keys))
    }

    fn set(&mut self, values: Values) -> Result<(), SettingsError> {
        self.values.extend(values);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SettingsError> {
        self.values.clear();
        Ok(())
    }
}

/// Settings kept as one JSON object on disk.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/aichat/settings.json`
    pub fn default_location() -> Result<Self, SettingsError> {
        let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(Self::new(dir.join("aichat").join("settings.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Values, SettingsError> {
        if !self.path.exists() {
            return Ok(Values::new());
        }

        let content = fs::read_to_string(&self.path)?;
        let value: Value = serde_json::from_str(&content)?;
        match value {
            Value::Object(values) => Ok(values),
            _ => Err(SettingsError::NotAnObject),
        }
    }

    fn write_all(&self, values: &Values) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, keys: &[&str]) -> Result<Values, SettingsError> {
        Ok(pick(&self.read_all()?, keys))
    }

    fn set(&mut self, values: Values) -> Result<(), SettingsError> {
        let mut all = self.read_all()?;
        all.extend(values);
        self.write_all(&all)?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SettingsError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn pick(values: &Values, keys: &[&str]) -> Values {
    keys.iter()
        .filter_map(|key| values.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect()
}

/// Provider API keys. An empty string means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    pub openai_key: String,
    pub gemini_key: String,
}

impl ApiKeys {
    pub fn load(store: &dyn SettingsStore) -> Result<Self, SettingsError> {
        let values = store.get(&[OPENAI_KEY, GEMINI_KEY])?;
        let text = |key: &str| {
            values
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Ok(Self {
            openai_key: text(OPENAI_KEY),
            gemini_key: text(GEMINI_KEY),
        })
    }

    /// Store both keys along with the derived `isConfigured` flag.
    pub fn save(&self, store: &mut dyn SettingsStore) -> Result<(), SettingsError> {
        let mut values = Values::new();
        values.insert(OPENAI_KEY.to_string(), Value::from(self.openai_key.as_str()));
        values.insert(GEMINI_KEY.to_string(), Value::from(self.gemini_key.as_str()));
        values.insert(IS_CONFIGURED.to_string(), Value::from(self.is_configured()));
        store.set(values)
    }

    pub fn is_configured(&self) -> bool {
        !self.openai_key.is_empty() || !self.gemini_key.is_empty()
    }
}

/// Whether any API key is stored.
pub fn is_configured(store: &dyn SettingsStore) -> Result<bool, SettingsError> {
    Ok(ApiKeys::load(store)?.is_configured())
}

/// Hide a key for display, keeping its first few characters.
pub fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    let visible: String = key.chars().take(4).collect();
    if key.chars().count() <= 8 {
        "•".repeat(8)
    } else {
        format!("{visible}{}", "•".repeat(8))
    }
}
