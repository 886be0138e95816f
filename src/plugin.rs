//! Plugin registry: named categories holding singleton implementations.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{CurateError, Result};
use crate::record::Recorder;

/// Category under which the session recorder is looked up.
pub const RECORDER_CATEGORY: &str = "curate";

#[derive(Default)]
pub struct PluginRegistry {
    recorders: HashMap<String, Arc<dyn Recorder>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_recorder(&mut self, category: &str, recorder: Arc<dyn Recorder>) -> Result<()> {
        if self.recorders.contains_key(category) {
            return Err(CurateError::DuplicatePlugin(category.to_string()));
        }
        self.recorders.insert(category.to_string(), recorder);
        Ok(())
    }

    /// The single recorder configured for `category`. Every lookup returns the same instance.
    pub fn single_recorder(&self, category: &str) -> Option<Arc<dyn Recorder>> {
        self.recorders.get(category).cloned()
    }
}
