use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{CurateError, Result};
use crate::plugin::PluginRegistry;
use crate::record::Recorder;

/// What the session does with a resource when it is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposalPolicy {
    None,
    Close,
}

impl DisposalPolicy {
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            DisposalPolicy::None => None,
            DisposalPolicy::Close => Some("close"),
        }
    }
}

/// A resource shared by the tasks of one session.
#[derive(Debug, Clone)]
pub enum SharedResource {
    Recorder(Arc<dyn Recorder>),
}

impl SharedResource {
    pub fn as_recorder(&self) -> Option<Arc<dyn Recorder>> {
        match self {
            SharedResource::Recorder(recorder) => Some(Arc::clone(recorder)),
        }
    }

    async fn close(&self) -> anyhow::Result<()> {
        match self {
            SharedResource::Recorder(recorder) => recorder.close().await,
        }
    }
}

#[derive(Debug, Clone)]
struct ManagedResource {
    resource: SharedResource,
    disposal: DisposalPolicy,
}

struct SessionInner {
    id: Uuid,
    plugins: Arc<PluginRegistry>,
    resources: DashMap<String, ManagedResource>,
    results: DashMap<String, String>,
}

/// Orchestration session: the resource table and result slots tasks see.
#[derive(Clone)] // cheap: one Arc
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("resources", &self.inner.resources.len())
            .finish()
    }
}

impl Session {
    pub fn new(plugins: Arc<PluginRegistry>) -> Self {
        let id = Uuid::new_v4();
        debug!(session = %id, "session opened");
        Self {
            inner: Arc::new(SessionInner {
                id,
                plugins,
                resources: DashMap::new(),
                results: DashMap::new(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.inner.plugins
    }

    pub fn obtain_resource(&self, key: &str) -> Option<SharedResource> {
        self.inner.resources.get(key).map(|r| r.resource.clone())
    }

    /// Registers `resource` under `key`. The first registration wins; returns
    /// false when the key was already taken.
    pub fn manage_resource(&self, key: &str, resource: SharedResource, disposal: DisposalPolicy) -> bool {
        let mut inserted = false;
        self.inner.resources.entry(key.to_string()).or_insert_with(|| {
            inserted = true;
            ManagedResource { resource, disposal }
        });
        if inserted {
            debug!(session = %self.inner.id, key, disposal = ?disposal.as_str(), "resource managed");
        }
        inserted
    }

    pub fn resource_count(&self) -> usize {
        self.inner.resources.len()
    }

    /// Result message reported by a task for the object it is working on.
    pub fn set_result(&self, task_name: &str, result: impl Into<String>) {
        self.inner.results.insert(task_name.to_string(), result.into());
    }

    pub fn result(&self, task_name: &str) -> Option<String> {
        self.inner.results.get(task_name).map(|r| r.value().clone())
    }

    pub fn take_result(&self, task_name: &str) -> Option<String> {
        self.inner.results.remove(task_name).map(|(_, r)| r)
    }

    pub fn clear_result(&self, task_name: &str) {
        self.inner.results.remove(task_name);
    }

    /// Closes every resource registered with [`DisposalPolicy::Close`] and
    /// empties the table. All resources are visited; the first failure is returned.
    pub async fn teardown(&self) -> Result<()> {
        let keys: Vec<String> = self.inner.resources.iter().map(|e| e.key().clone()).collect();
        let mut first_error = None;

        for key in keys {
            let Some((_, managed)) = self.inner.resources.remove(&key) else {
                continue;
            };
            if managed.disposal != DisposalPolicy::Close {
                continue;
            }
            if let Err(e) = managed.resource.close().await {
                error!(session = %self.inner.id, key = %key, error = ?e, "failed to close resource");
                if first_error.is_none() {
                    first_error = Some(CurateError::Recording(e));
                }
            }
        }
        self.inner.results.clear();
        info!(session = %self.inner.id, "session torn down");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
