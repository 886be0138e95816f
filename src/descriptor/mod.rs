//! YAML task descriptor: binds task names to implementations and declares their policy.

pub mod loader;
pub mod factory;

use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::task::{Invoked, Marker, RecordSpec, TaskDeclaration};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(default)]
    pub recorder: Option<RecorderConfig>,
    pub tasks: Vec<TaskEntry>,
}

/// Which recorder the session should use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecorderConfig {
    Log,
    Memory,
    Jsonl { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub name: String,
    /// Implementation name known to the [`factory::TaskFactory`].
    #[serde(default)]
    pub plugin: Option<String>,
    /// Expression body; makes this a scripted task.
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub distributive: bool,
    #[serde(default)]
    pub mutative: bool,
    #[serde(default)]
    pub suspendable: Option<SuspendEntry>,
    #[serde(default)]
    pub records: Vec<RecordSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspendEntry {
    #[serde(default = "default_invoked")]
    pub invoked: Invoked,
    pub status_codes: Vec<i32>,
}

fn default_invoked() -> Invoked {
    Invoked::Any
}

impl TaskEntry {
    /// True when the entry itself says anything about policy.
    pub fn declares_policy(&self) -> bool {
        self.distributive || self.mutative || self.suspendable.is_some() || !self.records.is_empty()
    }

    pub fn declaration(&self) -> TaskDeclaration {
        let mut declaration = TaskDeclaration::new();
        if self.distributive {
            declaration = declaration.distributive();
        }
        if self.mutative {
            declaration = declaration.mutative();
        }
        if let Some(suspend) = &self.suspendable {
            declaration = declaration.suspendable(suspend.invoked, suspend.status_codes.iter().copied());
        }
        match self.records.len() {
            0 => declaration,
            1 => declaration.marker(Marker::Record(self.records[0].clone())),
            _ => declaration.records(self.records.clone()),
        }
    }
}
