//! Reads crawl configurations from a directory of JSON files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use action_flow::{ConfigurationLoader, EngineError};
use async_trait::async_trait;
use serde_json::Value;
use tenderscout_core_types::Configuration;
use tracing::debug;

/// Resolves configuration `id` to `<dir>/<id>.json`.
///
/// The file may omit `id`; the file stem is used instead.
pub struct JsonDirectoryLoader {
    dir: PathBuf,
}

impl JsonDirectoryLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Option<PathBuf> {
        let trimmed = id.trim();
        if trimmed.is_empty()
            || trimmed.contains(&['/', '\\'][..])
            || trimmed.contains("..")
        {
            return None;
        }
        Some(self.dir.join(format!("{trimmed}.json")))
    }
}

#[async_trait]
impl ConfigurationLoader for JsonDirectoryLoader {
    async fn load(&self, id: &str) -> Result<Configuration, EngineError> {
        let path = self
            .path_for(id)
            .ok_or_else(|| EngineError::ConfigurationNotFound(id.to_string()))?;
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(EngineError::ConfigurationNotFound(id.to_string()))
            }
            Err(err) => {
                return Err(EngineError::InvalidConfiguration(format!(
                    "{}: {err}",
                    path.display()
                )))
            }
        };

        let mut value: Value = serde_json::from_str(&raw).map_err(|err| {
            EngineError::InvalidConfiguration(format!("{}: {err}", path.display()))
        })?;
        if let Value::Object(map) = &mut value {
            map.entry("id")
                .or_insert_with(|| Value::String(id.trim().to_string()));
        }
        let configuration: Configuration = serde_json::from_value(value).map_err(|err| {
            EngineError::InvalidConfiguration(format!("{}: {err}", path.display()))
        })?;
        debug!(path = %path.display(), steps = configuration.total_steps(), "Loaded configuration");
        Ok(configuration)
    }
}
