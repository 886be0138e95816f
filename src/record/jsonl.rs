use async_trait::async_trait;
use anyhow::{Result, Context as AnyhowContext, anyhow};
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::record::{RecordEntry, Recorder};

/// Appends records to a file, one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesRecorder {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl JsonLinesRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl Recorder for JsonLinesRecorder {
    async fn init(&self) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open record file {}", self.path.display()))?;
        *self.file.lock().await = Some(file);
        debug!(path = %self.path.display(), "record file opened");
        Ok(())
    }

    async fn record(&self, entry: &RecordEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut guard = self.file.lock().await;
        let file = guard.as_mut()
            .ok_or_else(|| anyhow!("record file {} is not open", self.path.display()))?;
        file.write_all(&line).await
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        Ok(())
    }

    fn is_closeable(&self) -> bool {
        true
    }

    async fn close(&self) -> Result<()> {
        if let Some(mut file) = self.file.lock().await.take() {
            file.flush().await?;
            file.sync_all().await?;
            debug!(path = %self.path.display(), "record file closed");
        }
        Ok(())
    }
}
