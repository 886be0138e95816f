use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{CurateError, Result};
use crate::task::policy::TaskDeclaration;
use crate::task::resolved::ResolvedTask;
use crate::task::{CurationTask, ScriptedTask, TaskVariant};

/// Builds the task instance behind one resolved wrapper.
pub type VariantFactory = Arc<dyn Fn() -> TaskVariant + Send + Sync>;

struct CatalogEntry {
    factory: VariantFactory,
    declaration: TaskDeclaration,
}

/// Task name -> implementation factory and declaration.
///
/// Built during setup, read-only while curating. Every `resolve` gets its own
/// task instance, so one catalog can back any number of curators.
#[derive(Default)]
pub struct TaskCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl TaskCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a native task with the declaration its instances carry.
    pub fn register_native<T, F>(&mut self, name: &str, make: F) -> Result<()>
    where
        T: CurationTask + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let declaration = make().declaration();
        self.register_native_with(name, make, declaration)
    }

    pub fn register_native_with<T, F>(&mut self, name: &str, make: F, declaration: TaskDeclaration) -> Result<()>
    where
        T: CurationTask + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register_factory(name, Arc::new(move || TaskVariant::Native(Arc::new(make()))), declaration)
    }

    pub fn register_scripted<T, F>(&mut self, name: &str, make: F) -> Result<()>
    where
        T: ScriptedTask + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register_scripted_with(name, make, TaskDeclaration::default())
    }

    /// The declaration is kept but not processed when the task is resolved.
    pub fn register_scripted_with<T, F>(&mut self, name: &str, make: F, declaration: TaskDeclaration) -> Result<()>
    where
        T: ScriptedTask + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register_factory(name, Arc::new(move || TaskVariant::Scripted(Arc::new(make()))), declaration)
    }

    pub fn register_factory(&mut self, name: &str, factory: VariantFactory, declaration: TaskDeclaration) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(CurateError::DuplicateTask(name.to_string()));
        }
        self.entries.insert(name.to_string(), CatalogEntry { factory, declaration });
        Ok(())
    }

    /// Builds a fresh wrapper around a fresh task instance. Its policy is extracted here.
    pub fn resolve(&self, name: &str) -> Result<ResolvedTask> {
        let entry = self.entries
            .get(name)
            .ok_or_else(|| CurateError::UnknownTask(name.to_string()))?;
        Ok(ResolvedTask::from_variant(name, (entry.factory)(), &entry.declaration))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for TaskCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskCatalog").field("tasks", &self.names()).finish()
    }
}
