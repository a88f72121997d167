use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StorageErrKind {
    #[error("artifact not found: {0}")]
    NotFound(String),
    #[error("invalid artifact path: {0}")]
    InvalidPath(String),
    #[error("io failure: {0}")]
    IoFailed(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error(transparent)]
pub struct StorageError(pub StorageErrKind);

impl StorageError {
    pub fn new(kind: StorageErrKind) -> Self {
        Self(kind)
    }

    pub fn kind(&self) -> &StorageErrKind {
        &self.0
    }

    pub fn io(path: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            return Self(StorageErrKind::NotFound(path.to_string()));
        }
        Self(StorageErrKind::IoFailed(format!("{path}: {err}")))
    }
}

impl From<StorageErrKind> for StorageError {
    fn from(kind: StorageErrKind) -> Self {
        StorageError(kind)
    }
}
