use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::errors::{StorageErrKind, StorageError};
use crate::{ArtifactStore, StorageResult};

/// Stores artifacts as plain files below `root`.
#[derive(Clone, Debug)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.trim().is_empty() || escapes {
            return Err(StorageErrKind::InvalidPath(path.to_string()).into());
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| StorageError::io(path, err))?;
        }

        let tmp = target.with_extension("part");
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|err| StorageError::io(path, err))?;
        file.write_all(&bytes)
            .await
            .map_err(|err| StorageError::io(path, err))?;
        file.sync_all()
            .await
            .map_err(|err| StorageError::io(path, err))?;
        drop(file);
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|err| StorageError::io(path, err))?;

        debug!(path, content_type, size = bytes.len(), "artifact stored");
        Ok(path.to_string())
    }

    async fn download(&self, path: &str) -> StorageResult<Vec<u8>> {
        let target = self.resolve(path)?;
        tokio::fs::read(&target)
            .await
            .map_err(|err| StorageError::io(path, err))
    }

    fn public_url(&self, path: &str) -> Option<String> {
        self.resolve(path)
            .ok()
            .map(|target| format!("file://{}", target.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_download() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsArtifactStore::new(dir.path());

        let path = store
            .upload("cfg/step-1/1-list.csv", b"a,b\n1,2".to_vec(), "text/csv")
            .await
            .expect("upload");
        assert_eq!(path, "cfg/step-1/1-list.csv");
        assert!(dir.path().join("cfg/step-1/1-list.csv").exists());

        let bytes = store.download(&path).await.expect("download");
        assert_eq!(bytes, b"a,b\n1,2");
    }

    #[tokio::test]
    async fn missing_artifact_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsArtifactStore::new(dir.path());
        let err = store.download("cfg/none.pdf").await.unwrap_err();
        assert_eq!(err.kind(), &StorageErrKind::NotFound("cfg/none.pdf".into()));
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsArtifactStore::new(dir.path());
        let err = store
            .upload("../escape.txt", Vec::new(), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), StorageErrKind::InvalidPath(_)));
    }
}
