use std::sync::{Mutex, PoisonError};

use crate::curator::context::{Context, CurationObject};
use crate::curator::session::Session;
use crate::curator::status::CURATE_FAIL;
use anyhow::Result;

pub mod builtin;
pub mod expression;

pub use self::builtin::{NoOpTask, ProfileTask, RequiredMetadataTask};
pub use self::expression::ExpressionTask;

/// Remembers the session and name a task was initialized with, so the task
/// can report result messages back to its curator.
#[derive(Debug, Default)]
pub struct Reporter {
    bound: Mutex<Option<(Session, String)>>,
}

impl Reporter {
    pub fn bind(&self, session: &Session, task_name: &str) {
        let mut bound = self.bound.lock().unwrap_or_else(PoisonError::into_inner);
        *bound = Some((session.clone(), task_name.to_string()));
    }

    pub fn report(&self, result: impl Into<String>) {
        let bound = self.bound.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((session, name)) = bound.as_ref() {
            session.set_result(name, result);
        }
    }
}

/// A clone starts unbound; its own `init` binds it.
impl Clone for Reporter {
    fn clone(&self) -> Self {
        Self::default()
    }
}

/// Loads `id` from the context store and hands it to `perform`; an unknown id fails the task.
pub async fn perform_by_id<F, Fut>(ctx: &Context, id: &str, reporter: &Reporter, perform: F) -> Result<i32>
where
    F: FnOnce(CurationObject) -> Fut,
    Fut: std::future::Future<Output = Result<i32>>,
{
    match ctx.find(id).await? {
        Some(object) => perform(object).await,
        None => {
            reporter.report(format!("Object {} not found", id));
            Ok(CURATE_FAIL)
        }
    }
}
