use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::{StorageErrKind, StorageError};
use crate::{ArtifactStore, StorageResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredArtifact {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Process-local store; uploads can be switched to fail for error-path tests.
#[derive(Default)]
pub struct MemoryArtifactStore {
    entries: DashMap<String, StoredArtifact>,
    reject_uploads: AtomicBool,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_uploads(&self, reject: bool) {
        self.reject_uploads.store(reject, Ordering::SeqCst);
    }

    pub fn get(&self, path: &str) -> Option<StoredArtifact> {
        self.entries.get(path).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, path: impl Into<String>, bytes: Vec<u8>, content_type: &str) {
        self.entries.insert(
            path.into(),
            StoredArtifact {
                bytes,
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String> {
        if self.reject_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::new(StorageErrKind::IoFailed(format!(
                "{path}: uploads rejected"
            ))));
        }
        self.insert(path, bytes, content_type);
        Ok(path.to_string())
    }

    async fn download(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.get(path)
            .map(|artifact| artifact.bytes)
            .ok_or_else(|| StorageErrKind::NotFound(path.to_string()).into())
    }

    fn public_url(&self, path: &str) -> Option<String> {
        Some(format!("memory://{path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejected_uploads_surface_io_failure() {
        let store = MemoryArtifactStore::new();
        store.reject_uploads(true);
        let err = store
            .upload("cfg/step-1/f.pdf", vec![1], "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), StorageErrKind::IoFailed(_)));
        assert!(store.paths().is_empty());
    }
}
