//! ResolvedTask: uniform invocation of a native or scripted task.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, warn};

use crate::curator::context::{Context, CurationObject};
use crate::curator::session::{DisposalPolicy, Session, SharedResource};
use crate::error::{CurateError, Result};
use crate::plugin::RECORDER_CATEGORY;
use crate::record::{RecordEntry, Recorder};
use crate::task::policy::{Invoked, TaskDeclaration, TaskPolicy};
use crate::task::{CurationTask, ScriptedTask, TaskVariant};

/// Resource table key of the session recorder.
pub const RECORDER_KEY: &str = "curate::record::Recorder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Constructed,
    Initialized,
    Released,
}

#[derive(Debug)]
pub struct ResolvedTask {
    name: String,
    variant: TaskVariant,
    policy: TaskPolicy,
    recorder: Option<Arc<dyn Recorder>>,
    state: Lifecycle,
}

impl ResolvedTask {
    pub fn native(name: &str, task: Arc<dyn CurationTask>, declaration: &TaskDeclaration) -> Self {
        Self {
            name: name.to_string(),
            variant: TaskVariant::Native(task),
            policy: TaskPolicy::extract(declaration),
            recorder: None,
            state: Lifecycle::Constructed,
        }
    }

    /// Declarations are not processed for scripted tasks; the policy stays empty.
    pub fn scripted(name: &str, task: Arc<dyn ScriptedTask>, declaration: &TaskDeclaration) -> Self {
        if !declaration.is_empty() {
            warn!(task = name, "declarations on scripted tasks are not supported; ignoring");
        }
        Self {
            name: name.to_string(),
            variant: TaskVariant::Scripted(task),
            policy: TaskPolicy::default(),
            recorder: None,
            state: Lifecycle::Constructed,
        }
    }

    pub fn from_variant(name: &str, variant: TaskVariant, declaration: &TaskDeclaration) -> Self {
        match variant {
            TaskVariant::Native(task) => Self::native(name, task, declaration),
            TaskVariant::Scripted(task) => Self::scripted(name, task, declaration),
        }
    }

    /// Binds the session recorder when records are declared, then initializes the task.
    pub async fn init(&mut self, session: &Session) -> Result<()> {
        self.require(Lifecycle::Constructed, "init")?;

        if self.policy.requires_recorder() {
            self.recorder = Some(bind_recorder(session).await?);
        }
        self.variant
            .init(session, &self.name)
            .await
            .map_err(CurateError::Invocation)?;

        self.state = Lifecycle::Initialized;
        debug!(task = %self.name, session = %session.id(), recording = self.recorder.is_some(), "task initialized");
        Ok(())
    }

    pub async fn perform(&self, object: &CurationObject) -> Result<i32> {
        self.require(Lifecycle::Initialized, "perform")?;
        self.variant.perform(object).await.map_err(CurateError::Invocation)
    }

    pub async fn perform_id(&self, ctx: &Context, id: &str) -> Result<i32> {
        self.require(Lifecycle::Initialized, "perform")?;
        self.variant.perform_id(ctx, id).await.map_err(CurateError::Invocation)
    }

    /// Emits one record per declared spec that triggers on `status`.
    pub async fn record(
        &self,
        object_id: &str,
        ctx: Option<&Context>,
        status: i32,
        result: Option<&str>,
    ) -> Result<()> {
        self.require(Lifecycle::Initialized, "record")?;
        let Some(recorder) = &self.recorder else {
            return Ok(());
        };
        if !self.policy.requires_recorder() {
            return Ok(());
        }

        let actor_id = ctx
            .and_then(|c| c.current_user())
            .map(|user| user.name.clone());
        let timestamp = now_millis();

        for spec in self.policy.triggered(status) {
            let entry = RecordEntry {
                timestamp,
                object_id: object_id.to_string(),
                actor_id: actor_id.clone(),
                task_name: self.name.clone(),
                record_type: spec.record_type.clone(),
                value: spec.value.clone(),
                status,
                result: result.map(str::to_string),
            };
            recorder.record(&entry).await.map_err(CurateError::Recording)?;
        }
        Ok(())
    }

    /// Ends the lifecycle. The recorder itself stays with the session.
    pub fn release(&mut self) {
        self.recorder = None;
        self.state = Lifecycle::Released;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_distributive(&self) -> bool {
        self.policy.distributive
    }

    pub fn is_mutative(&self) -> bool {
        self.policy.mutative
    }

    pub fn mode(&self) -> Option<Invoked> {
        self.policy.suspension.as_ref().map(|s| s.invoked)
    }

    pub fn codes(&self) -> Option<&[i32]> {
        self.policy.suspension.as_ref().map(|s| s.status_codes.as_slice())
    }

    pub fn policy(&self) -> &TaskPolicy {
        &self.policy
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state
    }

    pub fn is_scripted(&self) -> bool {
        self.variant.is_scripted()
    }

    pub fn variant(&self) -> &TaskVariant {
        &self.variant
    }

    fn require(&self, expected: Lifecycle, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CurateError::Precondition {
                task: self.name.clone(),
                operation,
                state: self.state,
            })
        }
    }
}

async fn bind_recorder(session: &Session) -> Result<Arc<dyn Recorder>> {
    if let Some(recorder) = session.obtain_resource(RECORDER_KEY).and_then(|r| r.as_recorder()) {
        return Ok(recorder);
    }

    let Some(recorder) = session.plugins().single_recorder(RECORDER_CATEGORY) else {
        error!(session = %session.id(), "No recorder configured");
        return Err(CurateError::MissingRecorder);
    };
    recorder.init().await.map_err(CurateError::Recording)?;

    let disposal = if recorder.is_closeable() {
        DisposalPolicy::Close
    } else {
        DisposalPolicy::None
    };
    if !session.manage_resource(RECORDER_KEY, SharedResource::Recorder(Arc::clone(&recorder)), disposal) {
        // Another wrapper registered while this one was initializing the recorder.
        if let Some(registered) = session.obtain_resource(RECORDER_KEY).and_then(|r| r.as_recorder()) {
            debug!(session = %session.id(), "recorder already registered; using the session's");
            return Ok(registered);
        }
    }
    Ok(recorder)
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
