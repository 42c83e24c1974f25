//! Storage settings and repository selection
//!
//! Settings come from a JSON config file such as
//! `{"storage_type": "xml", "storage_file": "data/todos.xml"}`. Missing keys
//! fall back to defaults, and `TODO_STORAGE_TYPE` / `TODO_STORAGE_FILE`
//! override whatever the file says.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::task::{JsonTaskStore, TaskRepository, XmlTaskStore};
use crate::{Error, Result};

pub const STORAGE_TYPE_ENV: &str = "TODO_STORAGE_TYPE";
pub const STORAGE_FILE_ENV: &str = "TODO_STORAGE_FILE";

/// Default config file name, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Json,
    Xml,
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Xml => f.write_str("xml"),
        }
    }
}

impl FromStr for StorageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            other => Err(Error::Config(format!("Unsupported storage type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storage_type: StorageType,
    pub storage_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Json,
            storage_file: PathBuf::from("todos.json"),
        }
    }
}

impl Settings {
    /// Parse a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::storage("read config", path, e))?;
        Self::from_json(&content)
    }

    fn from_json(content: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config file: {}", e)))?;
        settings.validate()
    }

    /// Load settings from `path`, falling back to defaults when the file is
    /// missing, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = match fs::read_to_string(path) {
            Ok(content) => {
                debug!("Loaded config from {}", path.display());
                Self::from_json(&content)?
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            Err(err) => return Err(Error::storage("read config", path, err)),
        };
        settings.with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_overrides(
            std::env::var(STORAGE_TYPE_ENV).ok(),
            std::env::var(STORAGE_FILE_ENV).ok(),
        )
    }

    fn apply_overrides(
        mut self,
        storage_type: Option<String>,
        storage_file: Option<String>,
    ) -> Result<Self> {
        if let Some(raw) = storage_type.filter(|v| !v.trim().is_empty()) {
            self.storage_type = raw.parse()?;
        }
        if let Some(raw) = storage_file.filter(|v| !v.trim().is_empty()) {
            self.storage_file = PathBuf::from(raw);
        }
        self.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.storage_file.to_string_lossy().trim().is_empty() {
            return Err(Error::Config("storage_file cannot be empty".to_string()));
        }
        Ok(self)
    }
}

/// Open the repository the settings ask for
pub fn create_repository(settings: &Settings) -> Result<Box<dyn TaskRepository>> {
    debug!(
        "Opening {} task store at {}",
        settings.storage_type,
        settings.storage_file.display()
    );
    let repository: Box<dyn TaskRepository> = match settings.storage_type {
        StorageType::Json => Box::new(JsonTaskStore::new(&settings.storage_file)?),
        StorageType::Xml => Box::new(XmlTaskStore::new(&settings.storage_file)?),
    };
    Ok(repository)
}
