use async_trait::async_trait;
use anyhow::Result;
use tracing::info;

use crate::record::{RecordEntry, Recorder};

/// Writes every record as a structured tracing event.
#[derive(Debug, Default)]
pub struct LogRecorder;

#[async_trait]
impl Recorder for LogRecorder {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn record(&self, entry: &RecordEntry) -> Result<()> {
        info!(
            target: "curate::record",
            timestamp = entry.timestamp,
            object_id = %entry.object_id,
            actor = entry.actor_id.as_deref().unwrap_or("-"),
            task = %entry.task_name,
            record_type = %entry.record_type,
            value = %entry.value,
            status = entry.status,
            result = entry.result.as_deref().unwrap_or(""),
            "curation record"
        );
        Ok(())
    }
}
