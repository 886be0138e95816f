use async_trait::async_trait;
use anyhow::Result;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::record::{RecordEntry, Recorder};

/// Keeps records in memory. Counts `init`/`close` calls so binding can be observed.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    entries: Mutex<Vec<RecordEntry>>,
    closeable: bool,
    inits: AtomicUsize,
    closes: AtomicUsize,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A memory recorder that asks to be closed at session teardown.
    pub fn closeable() -> Self {
        Self {
            closeable: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<RecordEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Recorder for MemoryRecorder {
    async fn init(&self) -> Result<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn record(&self, entry: &RecordEntry) -> Result<()> {
        let mut entries = self.entries.lock()
            .map_err(|_| anyhow::anyhow!("memory recorder lock poisoned"))?;
        entries.push(entry.clone());
        Ok(())
    }

    fn is_closeable(&self) -> bool {
        self.closeable
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
