//! Curator: drives resolved tasks over repository objects.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{CurateError, Result};
use crate::task::{Invoked, ResolvedTask, TaskCatalog};

pub mod context;
pub mod session;
pub mod status;

use self::context::{Context, CurationObject};
use self::session::Session;
use self::status::CURATE_UNSET;

/// Outcome of one task over one curate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRun {
    pub task: String,
    /// Status of the last object the task was performed on.
    pub status: i32,
    pub result: Option<String>,
    /// Number of objects the task was performed on.
    pub performed: usize,
    pub suspended: bool,
}

pub struct Curator {
    session: Session,
    catalog: Arc<TaskCatalog>,
    invoked: Invoked,
    tasks: Vec<ResolvedTask>,
}

impl Curator {
    pub fn new(session: Session, catalog: Arc<TaskCatalog>, invoked: Invoked) -> Self {
        Self {
            session,
            catalog,
            invoked,
            tasks: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Resolves `name` and initializes it against this curator's session.
    /// Adding a task that is already queued is a no-op.
    pub async fn add_task(&mut self, name: &str) -> Result<&mut Self> {
        if self.has_task(name) {
            return Ok(self);
        }
        let mut task = self.catalog.resolve(name)?;
        task.init(&self.session).await?;
        self.tasks.push(task);
        Ok(self)
    }

    pub fn remove_task(&mut self, name: &str) {
        if let Some(pos) = self.tasks.iter().position(|t| t.name() == name) {
            let mut task = self.tasks.remove(pos);
            task.release();
        }
    }

    pub fn has_task(&self, name: &str) -> bool {
        self.tasks.iter().any(|t| t.name() == name)
    }

    pub fn task(&self, name: &str) -> Option<&ResolvedTask> {
        self.tasks.iter().find(|t| t.name() == name)
    }

    /// Runs every queued task, in the order added, over the object `id`.
    pub async fn curate(&self, ctx: &Context, id: &str) -> Result<Vec<TaskRun>> {
        let root = ctx
            .find(id)
            .await
            .map_err(CurateError::Invocation)?
            .ok_or_else(|| CurateError::ObjectNotFound(id.to_string()))?;

        let mut runs = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            let run = self.run_task(task, ctx, &root).await?;
            info!(
                task = %run.task,
                object_id = %root.id,
                status = status::label(run.status),
                performed = run.performed,
                suspended = run.suspended,
                "task complete"
            );
            runs.push(run);
        }
        Ok(runs)
    }

    async fn run_task(&self, task: &ResolvedTask, ctx: &Context, root: &CurationObject) -> Result<TaskRun> {
        let mut run = TaskRun {
            task: task.name().to_string(),
            status: CURATE_UNSET,
            result: None,
            performed: 0,
            suspended: false,
        };

        // Distributive tasks walk containers themselves.
        if task.is_distributive() {
            self.apply(task, ctx, root, &mut run).await?;
            return Ok(run);
        }

        let mut seen = HashSet::new();
        let mut pending = vec![root.clone()];
        while let Some(object) = pending.pop() {
            if !seen.insert(object.id.clone()) {
                continue;
            }
            if !self.apply(task, ctx, &object, &mut run).await? {
                break;
            }
            for member in object.members.iter().rev() {
                match ctx.find(member).await.map_err(CurateError::Invocation)? {
                    Some(child) => pending.push(child),
                    None => warn!(parent = %object.id, member = %member, "member not found"),
                }
            }
        }
        Ok(run)
    }

    /// Performs and records one object. Returns false when the task asks to suspend.
    async fn apply(&self, task: &ResolvedTask, ctx: &Context, object: &CurationObject, run: &mut TaskRun) -> Result<bool> {
        self.session.clear_result(task.name());
        let status = task.perform(object).await?;
        let result = self.session.take_result(task.name());
        task.record(&object.id, Some(ctx), status, result.as_deref()).await?;

        run.status = status;
        run.result = result;
        run.performed += 1;

        if self.suspends(task, status) {
            info!(task = %task.name(), object_id = %object.id, status, "task suspended");
            run.suspended = true;
            return Ok(false);
        }
        Ok(true)
    }

    fn suspends(&self, task: &ResolvedTask, status: i32) -> bool {
        match (task.mode(), task.codes()) {
            (Some(mode), Some(codes)) => mode.applies_to(self.invoked) && codes.contains(&status),
            _ => false,
        }
    }

    /// Releases every task and tears the session down.
    pub async fn shutdown(mut self) -> Result<()> {
        for task in &mut self.tasks {
            task.release();
        }
        self.tasks.clear();
        self.session.teardown().await
    }
}
