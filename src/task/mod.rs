use async_trait::async_trait;
use anyhow::Result;
use std::fmt::Debug;
use std::sync::Arc;

use crate::curator::context::{Context, CurationObject};
use crate::curator::session::Session;

pub mod policy;
pub mod resolved;
pub mod catalog;

pub use self::policy::{Invoked, Marker, RecordSpec, TaskDeclaration, TaskPolicy};
pub use self::resolved::{Lifecycle, ResolvedTask};
pub use self::catalog::{TaskCatalog, VariantFactory};

/// Native curation task.
#[async_trait]
pub trait CurationTask: Send + Sync + Debug {
    /// Declarative metadata used when the task is registered by type.
    fn declaration(&self) -> TaskDeclaration {
        TaskDeclaration::default()
    }

    async fn init(&self, session: &Session, task_name: &str) -> Result<()>;

    async fn perform(&self, object: &CurationObject) -> Result<i32>;

    async fn perform_id(&self, ctx: &Context, id: &str) -> Result<i32>;
}

/// Scripted curation task. Same behaviour as [`CurationTask`], different entry points.
#[async_trait]
pub trait ScriptedTask: Send + Sync + Debug {
    async fn init(&self, session: &Session, task_name: &str) -> Result<()>;

    async fn perform_dso(&self, object: &CurationObject) -> Result<i32>;

    async fn perform_id(&self, ctx: &Context, id: &str) -> Result<i32>;
}

/// The one implementation a task name resolves to.
#[derive(Debug, Clone)]
pub enum TaskVariant {
    Native(Arc<dyn CurationTask>),
    Scripted(Arc<dyn ScriptedTask>),
}

impl TaskVariant {
    pub fn is_scripted(&self) -> bool {
        matches!(self, TaskVariant::Scripted(_))
    }

    /// The native task's own declaration; scripted tasks declare nothing.
    pub fn declaration(&self) -> TaskDeclaration {
        match self {
            TaskVariant::Native(task) => task.declaration(),
            TaskVariant::Scripted(_) => TaskDeclaration::default(),
        }
    }

    pub async fn init(&self, session: &Session, task_name: &str) -> Result<()> {
        match self {
            TaskVariant::Native(task) => task.init(session, task_name).await,
            TaskVariant::Scripted(task) => task.init(session, task_name).await,
        }
    }

    pub async fn perform(&self, object: &CurationObject) -> Result<i32> {
        match self {
            TaskVariant::Native(task) => task.perform(object).await,
            TaskVariant::Scripted(task) => task.perform_dso(object).await,
        }
    }

    pub async fn perform_id(&self, ctx: &Context, id: &str) -> Result<i32> {
        match self {
            TaskVariant::Native(task) => task.perform_id(ctx, id).await,
            TaskVariant::Scripted(task) => task.perform_id(ctx, id).await,
        }
    }
}
