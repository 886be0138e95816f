use anyhow::{Result, anyhow, bail};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::descriptor::{Descriptor, RecorderConfig, TaskEntry};
use crate::record::{JsonLinesRecorder, LogRecorder, MemoryRecorder, Recorder};
use crate::task::{CurationTask, TaskCatalog, TaskVariant, VariantFactory};
use crate::tasks::{ExpressionTask, NoOpTask, ProfileTask, RequiredMetadataTask};

pub type TaskParams = BTreeMap<String, serde_yaml::Value>;

type Builder = Box<dyn Fn(&TaskParams) -> Result<VariantFactory> + Send + Sync>;

/// Creates native task implementations by plugin name.
///
/// Params are checked once, when the catalog is built; every resolved wrapper
/// then gets a clone of the configured task.
#[derive(Default)]
pub struct TaskFactory {
    builders: HashMap<String, Builder>,
}

impl TaskFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory knowing `noop`, `required-metadata` and `profile`.
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.register("noop", |_| Ok(NoOpTask::default()));
        factory.register("profile", |_| Ok(ProfileTask::default()));
        factory.register("required-metadata", |params| {
            let task = match params.get("fields") {
                Some(fields) => {
                    let fields: Vec<String> = serde_yaml::from_value(fields.clone())
                        .map_err(|e| anyhow!("required-metadata: invalid fields: {}", e))?;
                    RequiredMetadataTask::new(fields)
                }
                None => RequiredMetadataTask::default(),
            };
            Ok(task)
        });
        factory
    }

    pub fn register<T, F>(&mut self, plugin: &str, builder: F)
    where
        T: CurationTask + Clone + 'static,
        F: Fn(&TaskParams) -> Result<T> + Send + Sync + 'static,
    {
        self.builders.insert(
            plugin.to_string(),
            Box::new(move |params: &TaskParams| {
                let configured = builder(params)?;
                let factory: VariantFactory = Arc::new(move || TaskVariant::Native(Arc::new(configured.clone())));
                Ok(factory)
            }),
        );
    }

    pub fn create(&self, plugin: &str, params: &TaskParams) -> Result<VariantFactory> {
        let builder = self.builders
            .get(plugin)
            .ok_or_else(|| anyhow!("Task plugin not found: {}", plugin))?;
        builder(params)
    }

    /// Instantiates and registers every task of `descriptor`.
    pub fn build_catalog(&self, descriptor: &Descriptor) -> Result<TaskCatalog> {
        let mut catalog = TaskCatalog::new();
        for entry in &descriptor.tasks {
            self.register_entry(&mut catalog, entry)?;
        }
        Ok(catalog)
    }

    fn register_entry(&self, catalog: &mut TaskCatalog, entry: &TaskEntry) -> Result<()> {
        match (&entry.plugin, &entry.script) {
            (Some(plugin), None) => {
                let factory = self.create(plugin, &entry.params)?;
                let declaration = if entry.declares_policy() {
                    entry.declaration()
                } else {
                    factory().declaration()
                };
                catalog.register_factory(&entry.name, factory, declaration)?;
            }
            (None, Some(script)) => {
                let script = script.clone();
                catalog.register_scripted_with(&entry.name, move || ExpressionTask::new(&script), entry.declaration())?;
            }
            (Some(_), Some(_)) => bail!("task {} has both a plugin and a script", entry.name),
            (None, None) => bail!("task {} has neither a plugin nor a script", entry.name),
        }
        debug!(task = %entry.name, "task registered");
        Ok(())
    }
}

impl RecorderConfig {
    pub fn build(&self) -> Arc<dyn Recorder> {
        match self {
            RecorderConfig::Log => Arc::new(LogRecorder),
            RecorderConfig::Memory => Arc::new(MemoryRecorder::new()),
            RecorderConfig::Jsonl { path } => Arc::new(JsonLinesRecorder::new(path)),
        }
    }
}
