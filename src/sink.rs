//! Appends created records to a JSON-lines file.

use std::path::{Path, PathBuf};

use action_flow::{RecordSink, SinkError};
use async_trait::async_trait;
use tenderscout_core_types::CreatedRecord;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub struct JsonLinesRecordSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesRecordSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSink for JsonLinesRecordSink {
    async fn insert(&self, record: &CreatedRecord) -> Result<(), SinkError> {
        let mut line =
            serde_json::to_string(record).map_err(|err| SinkError(format!("encode: {err}")))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| SinkError(format!("{}: {err}", parent.display())))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|err| SinkError(format!("{}: {err}", self.path.display())))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|err| SinkError(format!("{}: {err}", self.path.display())))?;
        file.flush()
            .await
            .map_err(|err| SinkError(format!("{}: {err}", self.path.display())))
    }
}
