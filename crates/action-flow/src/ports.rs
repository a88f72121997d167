//! Collaborators the engine consumes: configuration lookup and record persistence.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashSet;
use tenderscout_core_types::{Configuration, CreatedRecord};
use thiserror::Error;

use crate::errors::EngineError;

/// Loads stored configurations by id.
#[async_trait]
pub trait ConfigurationLoader: Send + Sync {
    /// Fails with [`EngineError::ConfigurationNotFound`] when `id` is unknown.
    async fn load(&self, id: &str) -> Result<Configuration, EngineError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SinkError(pub String);

/// Relational insert capability for created records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn insert(&self, record: &CreatedRecord) -> Result<(), SinkError>;
}

#[derive(Default)]
pub struct InMemoryConfigurationLoader {
    configurations: DashMap<String, Configuration>,
}

impl InMemoryConfigurationLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, configuration: Configuration) -> Self {
        self.insert(configuration);
        self
    }

    pub fn insert(&self, configuration: Configuration) {
        self.configurations
            .insert(configuration.id.clone(), configuration);
    }
}

#[async_trait]
impl ConfigurationLoader for InMemoryConfigurationLoader {
    async fn load(&self, id: &str) -> Result<Configuration, EngineError> {
        self.configurations
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::ConfigurationNotFound(id.to_string()))
    }
}

/// Keeps inserted records in memory; titles registered with [`reject_title`](Self::reject_title)
/// fail to insert.
#[derive(Default)]
pub struct InMemoryRecordSink {
    records: Mutex<Vec<CreatedRecord>>,
    rejected_titles: Mutex<HashSet<String>>,
}

impl InMemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_title(self, title: impl Into<String>) -> Self {
        self.rejected_titles.lock().insert(title.into());
        self
    }

    pub fn records(&self) -> Vec<CreatedRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl RecordSink for InMemoryRecordSink {
    async fn insert(&self, record: &CreatedRecord) -> Result<(), SinkError> {
        if self.rejected_titles.lock().contains(record.title()) {
            return Err(SinkError(format!("insert rejected for '{}'", record.title())));
        }
        self.records.lock().push(record.clone());
        Ok(())
    }
}
