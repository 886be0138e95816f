use async_trait::async_trait;
use anyhow::Result;
use tracing::{debug, info};

use crate::curator::context::{Context, CurationObject, ObjectKind};
use crate::curator::session::Session;
use crate::curator::status::{CURATE_FAIL, CURATE_SKIP, CURATE_SUCCESS};
use crate::task::{CurationTask, TaskDeclaration};
use crate::tasks::{Reporter, perform_by_id};

/// Does nothing but log the object it was given.
#[derive(Debug, Default, Clone)]
pub struct NoOpTask {
    reporter: Reporter,
}

#[async_trait]
impl CurationTask for NoOpTask {
    async fn init(&self, session: &Session, task_name: &str) -> Result<()> {
        self.reporter.bind(session, task_name);
        Ok(())
    }

    async fn perform(&self, object: &CurationObject) -> Result<i32> {
        info!(object_id = %object.id, kind = ?object.kind, "noop");
        self.reporter.report(format!("Noop performed on {}", object.id));
        Ok(CURATE_SUCCESS)
    }

    async fn perform_id(&self, ctx: &Context, id: &str) -> Result<i32> {
        perform_by_id(ctx, id, &self.reporter, |o| async move { self.perform(&o).await }).await
    }
}

/// Fails items lacking any of the configured metadata fields.
#[derive(Debug, Clone)]
pub struct RequiredMetadataTask {
    fields: Vec<String>,
    reporter: Reporter,
}

impl RequiredMetadataTask {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            reporter: Reporter::default(),
        }
    }

    pub fn missing(&self, object: &CurationObject) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| object.values(f).iter().all(|v| v.trim().is_empty()))
            .map(String::as_str)
            .collect()
    }
}

impl Default for RequiredMetadataTask {
    fn default() -> Self {
        Self::new(["dc.title", "dc.date.issued"])
    }
}

#[async_trait]
impl CurationTask for RequiredMetadataTask {
    fn declaration(&self) -> TaskDeclaration {
        TaskDeclaration::new().record("validation", "missing required metadata", [CURATE_FAIL])
    }

    async fn init(&self, session: &Session, task_name: &str) -> Result<()> {
        self.reporter.bind(session, task_name);
        Ok(())
    }

    async fn perform(&self, object: &CurationObject) -> Result<i32> {
        if object.kind != ObjectKind::Item {
            return Ok(CURATE_SKIP);
        }
        let missing = self.missing(object);
        if missing.is_empty() {
            self.reporter.report(format!("Item {} has all required fields", object.id));
            Ok(CURATE_SUCCESS)
        } else {
            debug!(object_id = %object.id, ?missing, "required metadata missing");
            self.reporter.report(format!(
                "Item {} missing required field(s): {}",
                object.id,
                missing.join(", ")
            ));
            Ok(CURATE_FAIL)
        }
    }

    async fn perform_id(&self, ctx: &Context, id: &str) -> Result<i32> {
        perform_by_id(ctx, id, &self.reporter, |o| async move { self.perform(&o).await }).await
    }
}

/// Reports how many values each metadata field of an item carries.
#[derive(Debug, Default, Clone)]
pub struct ProfileTask {
    reporter: Reporter,
}

#[async_trait]
impl CurationTask for ProfileTask {
    async fn init(&self, session: &Session, task_name: &str) -> Result<()> {
        self.reporter.bind(session, task_name);
        Ok(())
    }

    async fn perform(&self, object: &CurationObject) -> Result<i32> {
        if object.kind != ObjectKind::Item {
            return Ok(CURATE_SKIP);
        }
        let profile: Vec<String> = object
            .metadata
            .iter()
            .map(|(field, values)| format!("{} ({})", field, values.len()))
            .collect();
        self.reporter.report(profile.join(", "));
        Ok(CURATE_SUCCESS)
    }

    async fn perform_id(&self, ctx: &Context, id: &str) -> Result<i32> {
        perform_by_id(ctx, id, &self.reporter, |o| async move { self.perform(&o).await }).await
    }
}
