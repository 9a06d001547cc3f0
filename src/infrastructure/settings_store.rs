//! JSON file settings store.
//!
//! Keeps all settings in one JSON object on disk. Reads never fail:
//! a missing or corrupt file behaves like an empty store.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::application::SettingsStore;
use crate::domain::{AppError, Result};

/// Settings store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Map<String, Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                tracing::warn!("Failed to read settings {}: {}", self.path.display(), e);
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                tracing::warn!("Settings file is not a JSON object, ignoring");
                Map::new()
            }
            Err(e) => {
                tracing::warn!("Failed to parse settings {}: {}", self.path.display(), e);
                Map::new()
            }
        }
    }

    fn write_all(&self, map: Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| AppError::io("Failed to create settings directory", e))?;
            }
        }

        let content =
            serde_json::to_string_pretty(&Value::Object(map)).map_err(AppError::json_parse)?;

        fs::write(&self.path, content).map_err(|e| {
            AppError::io(format!("Failed to write settings: {}", self.path.display()), e)
        })?;

        tracing::debug!(path = %self.path.display(), "Settings saved");

        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn get(&self, key: &str) -> Option<Value> {
        self.read_all().remove(key).filter(|v| !v.is_null())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut map = self.read_all();
        map.insert(key.to_string(), value);
        self.write_all(map)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.read_all();
        if map.remove(key).is_some() {
            self.write_all(map)?;
        }
        Ok(())
    }
}
