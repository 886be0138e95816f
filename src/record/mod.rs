use async_trait::async_trait;
use anyhow::Result;
use serde::{Serialize, Deserialize};
use std::fmt::Debug;

pub mod log;
pub mod memory;
pub mod jsonl;

pub use self::log::LogRecorder;
pub use self::memory::MemoryRecorder;
pub use self::jsonl::JsonLinesRecorder;

/// One structured result of a task run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub object_id: String,
    pub actor_id: Option<String>,
    pub task_name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
    pub status: i32,
    pub result: Option<String>,
}

/// Sink for curation records.
///
/// A single recorder is shared by every task of a session, so implementations
/// must tolerate concurrent `record` calls.
#[async_trait]
pub trait Recorder: Send + Sync + Debug {
    async fn init(&self) -> Result<()>;

    async fn record(&self, entry: &RecordEntry) -> Result<()>;

    /// Whether the recorder holds something that must be closed at teardown.
    fn is_closeable(&self) -> bool {
        false
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
