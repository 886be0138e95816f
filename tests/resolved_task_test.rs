use anyhow::{Result, anyhow};
use async_trait::async_trait;
use curate::curator::context::{Actor, Context, CurationObject, InMemoryObjectStore, ObjectKind};
use curate::curator::session::Session;
use curate::curator::status::{CURATE_FAIL, CURATE_SKIP, CURATE_SUCCESS};
use curate::plugin::{PluginRegistry, RECORDER_CATEGORY};
use curate::record::{MemoryRecorder, RecordEntry, Recorder};
use curate::task::resolved::RECORDER_KEY;
use curate::task::{CurationTask, Invoked, Lifecycle, ResolvedTask, ScriptedTask, TaskDeclaration};
use curate::CurateError;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Default)]
struct CountingTask {
    status: i32,
    inits: AtomicUsize,
    performs: AtomicUsize,
    performs_by_id: AtomicUsize,
    fail_init: bool,
    fail_perform: bool,
}

impl CountingTask {
    fn returning(status: i32) -> Self {
        Self { status, ..Self::default() }
    }
}

#[async_trait]
impl CurationTask for CountingTask {
    async fn init(&self, _session: &Session, _task_name: &str) -> Result<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(anyhow!("disk on fire"));
        }
        Ok(())
    }

    async fn perform(&self, object: &CurationObject) -> Result<i32> {
        self.performs.fetch_add(1, Ordering::SeqCst);
        if self.fail_perform {
            return Err(anyhow!("cannot read {}", object.id));
        }
        Ok(self.status)
    }

    async fn perform_id(&self, _ctx: &Context, id: &str) -> Result<i32> {
        self.performs_by_id.fetch_add(1, Ordering::SeqCst);
        if self.fail_perform {
            return Err(anyhow!("cannot read {}", id));
        }
        Ok(self.status)
    }
}

/// Recorder whose `init` fails.
#[derive(Debug)]
struct BrokenRecorder;

#[async_trait]
impl Recorder for BrokenRecorder {
    async fn init(&self) -> Result<()> {
        Err(anyhow!("record store unreachable"))
    }

    async fn record(&self, _entry: &RecordEntry) -> Result<()> {
        Ok(())
    }
}

/// Recorder that yields during `init`, so concurrent binders interleave.
#[derive(Debug, Default)]
struct SlowRecorder {
    inner: MemoryRecorder,
}

#[async_trait]
impl Recorder for SlowRecorder {
    async fn init(&self) -> Result<()> {
        tokio::task::yield_now().await;
        self.inner.init().await
    }

    async fn record(&self, entry: &RecordEntry) -> Result<()> {
        self.inner.record(entry).await
    }
}

#[derive(Debug, Default)]
struct CountingScript {
    inits: AtomicUsize,
    dso_calls: AtomicUsize,
    id_calls: AtomicUsize,
}

#[async_trait]
impl ScriptedTask for CountingScript {
    async fn init(&self, _session: &Session, _task_name: &str) -> Result<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn perform_dso(&self, _object: &CurationObject) -> Result<i32> {
        self.dso_calls.fetch_add(1, Ordering::SeqCst);
        Ok(CURATE_SKIP)
    }

    async fn perform_id(&self, _ctx: &Context, _id: &str) -> Result<i32> {
        self.id_calls.fetch_add(1, Ordering::SeqCst);
        Ok(CURATE_SKIP)
    }
}

fn session_with(recorder: Option<Arc<MemoryRecorder>>) -> Session {
    let mut plugins = PluginRegistry::new();
    if let Some(recorder) = recorder {
        plugins.register_recorder(RECORDER_CATEGORY, recorder).unwrap();
    }
    Session::new(Arc::new(plugins))
}

fn item() -> CurationObject {
    CurationObject::new("123456789/7", ObjectKind::Item)
}

fn context() -> Context {
    Context::new(Arc::new(InMemoryObjectStore::new()))
}

fn recording_declaration() -> TaskDeclaration {
    TaskDeclaration::new()
        .record("audit", "failed", [CURATE_FAIL])
        .record("audit", "seen", [CURATE_FAIL, CURATE_SKIP])
}

#[tokio::test]
async fn native_variant_receives_native_calls() {
    let native = Arc::new(CountingTask::returning(CURATE_SUCCESS));
    let mut task = ResolvedTask::native("count", native.clone(), &TaskDeclaration::new());
    task.init(&session_with(None)).await.unwrap();

    assert_eq!(task.perform(&item()).await.unwrap(), CURATE_SUCCESS);
    assert_eq!(task.perform_id(&context(), "123456789/7").await.unwrap(), CURATE_SUCCESS);

    assert_eq!(native.inits.load(Ordering::SeqCst), 1);
    assert_eq!(native.performs.load(Ordering::SeqCst), 1);
    assert_eq!(native.performs_by_id.load(Ordering::SeqCst), 1);
    assert!(!task.is_scripted());
}

#[tokio::test]
async fn scripted_variant_receives_scripted_calls() {
    let script = Arc::new(CountingScript::default());
    let mut task = ResolvedTask::scripted("script", script.clone(), &TaskDeclaration::new());
    task.init(&session_with(None)).await.unwrap();

    assert_eq!(task.perform(&item()).await.unwrap(), CURATE_SKIP);
    assert_eq!(task.perform_id(&context(), "x").await.unwrap(), CURATE_SKIP);

    assert_eq!(script.inits.load(Ordering::SeqCst), 1);
    assert_eq!(script.dso_calls.load(Ordering::SeqCst), 1);
    assert_eq!(script.id_calls.load(Ordering::SeqCst), 1);
    assert!(task.is_scripted());
}

#[tokio::test]
async fn no_record_markers_means_no_recorder_lookup() {
    // A recorder is configured, but the task never asks for it.
    let recorder = Arc::new(MemoryRecorder::new());
    let session = session_with(Some(recorder.clone()));
    let mut task = ResolvedTask::native("quiet", Arc::new(CountingTask::returning(CURATE_FAIL)), &TaskDeclaration::new());

    task.init(&session).await.unwrap();
    task.record("123456789/7", Some(&context()), CURATE_FAIL, Some("bad")).await.unwrap();

    assert_eq!(recorder.init_count(), 0);
    assert!(recorder.entries().is_empty());
    assert!(session.obtain_resource(RECORDER_KEY).is_none());
}

#[tokio::test]
async fn record_markers_without_recorder_fail_init() {
    let native = Arc::new(CountingTask::default());
    let mut task = ResolvedTask::native("loud", native.clone(), &recording_declaration());

    let err = task.init(&session_with(None)).await.unwrap_err();
    assert!(matches!(err, CurateError::MissingRecorder));
    assert_eq!(native.inits.load(Ordering::SeqCst), 0);
    assert_eq!(task.lifecycle(), Lifecycle::Constructed);
}

#[tokio::test]
async fn every_matching_spec_fires() {
    let recorder = Arc::new(MemoryRecorder::new());
    let mut task = ResolvedTask::native("loud", Arc::new(CountingTask::default()), &recording_declaration());
    task.init(&session_with(Some(recorder.clone()))).await.unwrap();

    task.record("1/1", None, CURATE_FAIL, Some("ok")).await.unwrap();
    assert_eq!(recorder.entries().len(), 2);

    task.record("1/2", None, CURATE_SKIP, None).await.unwrap();
    assert_eq!(recorder.entries().len(), 3);

    task.record("1/3", None, CURATE_SUCCESS, None).await.unwrap();
    assert_eq!(recorder.entries().len(), 3);

    let entries = recorder.entries();
    assert_eq!(entries[0].value, "failed");
    assert_eq!(entries[1].value, "seen");
    assert_eq!(entries[0].timestamp, entries[1].timestamp);
    assert_eq!(entries[0].result.as_deref(), Some("ok"));
    assert_eq!(entries[2].object_id, "1/2");
    assert!(entries.iter().all(|e| e.task_name == "loud"));
}

#[tokio::test]
async fn recorder_binding_happens_once_per_session() {
    let recorder = Arc::new(MemoryRecorder::closeable());
    let session = session_with(Some(recorder.clone()));

    let mut first = ResolvedTask::native("a", Arc::new(CountingTask::default()), &recording_declaration());
    let mut second = ResolvedTask::native("b", Arc::new(CountingTask::default()), &recording_declaration());
    first.init(&session).await.unwrap();
    second.init(&session).await.unwrap();

    assert_eq!(recorder.init_count(), 1);
    assert_eq!(session.resource_count(), 1);

    first.record("1/1", None, CURATE_SKIP, None).await.unwrap();
    second.record("1/1", None, CURATE_SKIP, None).await.unwrap();
    assert_eq!(recorder.entries().len(), 2);

    session.teardown().await.unwrap();
    assert_eq!(recorder.close_count(), 1);
}

#[tokio::test]
async fn suspend_accessors_reflect_the_marker() {
    let plain = ResolvedTask::native("plain", Arc::new(CountingTask::default()), &TaskDeclaration::new());
    assert!(plain.mode().is_none());
    assert!(plain.codes().is_none());
    assert!(!plain.is_distributive());
    assert!(!plain.is_mutative());

    let declaration = TaskDeclaration::new()
        .distributive()
        .mutative()
        .suspendable(Invoked::Batch, [CURATE_FAIL, 3]);
    let marked = ResolvedTask::native("marked", Arc::new(CountingTask::default()), &declaration);
    assert_eq!(marked.mode(), Some(Invoked::Batch));
    assert_eq!(marked.codes(), Some(&[CURATE_FAIL, 3][..]));
    assert!(marked.is_distributive());
    assert!(marked.is_mutative());
    assert_eq!(marked.name(), "marked");
}

#[tokio::test]
async fn scripted_tasks_ignore_declarations() {
    let task = ResolvedTask::scripted("script", Arc::new(CountingScript::default()), &recording_declaration());
    assert!(task.policy().record_specs.is_empty());
    assert!(task.mode().is_none());
}

#[tokio::test]
async fn actor_comes_from_the_current_user() {
    let recorder = Arc::new(MemoryRecorder::new());
    let mut task = ResolvedTask::native("loud", Arc::new(CountingTask::default()), &recording_declaration());
    task.init(&session_with(Some(recorder.clone()))).await.unwrap();

    let anonymous = context();
    let signed_in = context().with_user(Actor::new("curator@example.org"));

    task.record("1/1", None, CURATE_SKIP, None).await.unwrap();
    task.record("1/1", Some(&anonymous), CURATE_SKIP, None).await.unwrap();
    task.record("1/1", Some(&signed_in), CURATE_SKIP, None).await.unwrap();

    let actors: Vec<Option<String>> = recorder.entries().into_iter().map(|e| e.actor_id).collect();
    assert_eq!(actors, vec![None, None, Some("curator@example.org".to_string())]);
}

#[tokio::test]
async fn calls_out_of_order_are_rejected() {
    let mut task = ResolvedTask::native("count", Arc::new(CountingTask::default()), &TaskDeclaration::new());

    let err = task.perform(&item()).await.unwrap_err();
    assert!(matches!(err, CurateError::Precondition { operation: "perform", state: Lifecycle::Constructed, .. }));
    assert!(task.record("1/1", None, 0, None).await.is_err());

    let session = session_with(None);
    task.init(&session).await.unwrap();
    assert!(matches!(
        task.init(&session).await.unwrap_err(),
        CurateError::Precondition { operation: "init", .. }
    ));

    task.release();
    assert_eq!(task.lifecycle(), Lifecycle::Released);
    assert!(task.perform(&item()).await.is_err());
}

#[tokio::test]
async fn task_failures_surface_verbatim() {
    let native = Arc::new(CountingTask { fail_init: true, ..CountingTask::default() });
    let mut task = ResolvedTask::native("broken", native, &TaskDeclaration::new());

    let err = task.init(&session_with(None)).await.unwrap_err();
    assert!(matches!(err, CurateError::Invocation(_)));
    assert_eq!(err.to_string(), "disk on fire");
}

#[tokio::test]
async fn perform_failures_surface_verbatim() {
    let native = Arc::new(CountingTask { fail_perform: true, ..CountingTask::default() });
    let mut task = ResolvedTask::native("broken", native, &TaskDeclaration::new());
    task.init(&session_with(None)).await.unwrap();

    let err = task.perform(&item()).await.unwrap_err();
    assert!(matches!(err, CurateError::Invocation(_)));
    assert_eq!(err.to_string(), "cannot read 123456789/7");

    let err = task.perform_id(&context(), "1/9").await.unwrap_err();
    assert!(matches!(err, CurateError::Invocation(_)));
    assert_eq!(err.to_string(), "cannot read 1/9");
}

#[tokio::test]
async fn recorder_init_failure_registers_nothing() {
    let mut plugins = PluginRegistry::new();
    plugins.register_recorder(RECORDER_CATEGORY, Arc::new(BrokenRecorder)).unwrap();
    let session = Session::new(Arc::new(plugins));

    let native = Arc::new(CountingTask::default());
    let mut task = ResolvedTask::native("loud", native.clone(), &recording_declaration());

    let err = task.init(&session).await.unwrap_err();
    assert!(matches!(err, CurateError::Recording(_)));
    assert_eq!(session.resource_count(), 0);
    assert_eq!(task.lifecycle(), Lifecycle::Constructed);
    assert_eq!(native.inits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_binders_share_the_registered_recorder() {
    let recorder = Arc::new(SlowRecorder::default());
    let mut plugins = PluginRegistry::new();
    plugins.register_recorder(RECORDER_CATEGORY, recorder.clone()).unwrap();
    let session = Session::new(Arc::new(plugins));

    let mut first = ResolvedTask::native("a", Arc::new(CountingTask::default()), &recording_declaration());
    let mut second = ResolvedTask::native("b", Arc::new(CountingTask::default()), &recording_declaration());
    let (a, b) = tokio::join!(first.init(&session), second.init(&session));
    a.unwrap();
    b.unwrap();

    assert_eq!(session.resource_count(), 1);
    let registered = session
        .obtain_resource(RECORDER_KEY)
        .and_then(|r| r.as_recorder())
        .expect("recorder registered");

    first.record("1/1", None, CURATE_SKIP, None).await.unwrap();
    second.record("1/1", None, CURATE_SKIP, None).await.unwrap();
    let registered_entries = recorder.inner.entries();
    assert_eq!(registered_entries.len(), 2);
    assert!(Arc::ptr_eq(&registered, &(recorder.clone() as Arc<dyn Recorder>)));
}

#[tokio::test]
async fn record_timestamps_are_epoch_millis() {
    let recorder = Arc::new(MemoryRecorder::new());
    let mut task = ResolvedTask::native("loud", Arc::new(CountingTask::default()), &recording_declaration());
    task.init(&session_with(Some(recorder.clone()))).await.unwrap();

    let now = || SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as u64;
    let before = now();
    task.record("1/1", None, CURATE_SKIP, None).await.unwrap();
    let after = now();

    let stamp = recorder.entries()[0].timestamp;
    assert!(before <= stamp && stamp <= after);
}
