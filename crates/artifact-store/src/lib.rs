//! Artifact storage for files captured by automation steps.
//!
//! Artifacts are addressed by a relative path of the form
//! `{configuration_id}/{step_id}/{unix_millis}-{filename}` (see [`layout`]).
//! Two stores are provided: [`FsArtifactStore`] writes under a root directory and
//! [`MemoryArtifactStore`] keeps everything in a concurrent map.

pub mod content_type;
mod errors;
mod fs;
pub mod layout;
mod memory;

use async_trait::async_trait;

pub use content_type::content_type_for;
pub use errors::{StorageErrKind, StorageError};
pub use fs::FsArtifactStore;
pub use layout::{artifact_file_name, artifact_path, DEFAULT_DOWNLOAD_NAME};
pub use memory::{MemoryArtifactStore, StoredArtifact};

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` at `path`, replacing any previous content. Returns the stored path.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str)
        -> StorageResult<String>;

    async fn download(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Location a caller can use to fetch the artifact, if the store exposes one.
    fn public_url(&self, path: &str) -> Option<String>;
}
