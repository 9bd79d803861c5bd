//! In-memory backend and view used by the controller and poller tests.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use shared::protocol::{ProcessResponse, ProgressStatus};

use crate::{
    steps::Step,
    view::{DashboardTarget, PageSection, PageView, ViewBindings},
    ClientError, OcrBackend, Result, UploadForm,
};

pub(crate) enum ProgressScript {
    Report(ProgressStatus),
    Fail,
}

pub(crate) enum ProcessScript {
    Respond(ProcessResponse),
    Fail,
    Garbage,
}

pub(crate) struct ScriptedBackend {
    progress: Mutex<VecDeque<ProgressScript>>,
    process: Mutex<VecDeque<ProcessScript>>,
    progress_delay: Duration,
    process_delay: Duration,
    progress_calls: AtomicUsize,
    submit_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self {
            progress: Mutex::new(VecDeque::new()),
            process: Mutex::new(VecDeque::new()),
            progress_delay: Duration::ZERO,
            process_delay: Duration::ZERO,
            progress_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn report(self, status: ProgressStatus) -> Self {
        self.progress
            .lock()
            .expect("progress script")
            .push_back(ProgressScript::Report(status));
        self
    }

    pub(crate) fn progress_failure(self) -> Self {
        self.progress
            .lock()
            .expect("progress script")
            .push_back(ProgressScript::Fail);
        self
    }

    pub(crate) fn process(self, script: ProcessScript) -> Self {
        self.process
            .lock()
            .expect("process script")
            .push_back(script);
        self
    }

    pub(crate) fn progress_delay(mut self, delay: Duration) -> Self {
        self.progress_delay = delay;
        self
    }

    pub(crate) fn process_delay(mut self, delay: Duration) -> Self {
        self.process_delay = delay;
        self
    }

    pub(crate) fn progress_calls(&self) -> usize {
        self.progress_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrBackend for ScriptedBackend {
    async fn submit(&self, _form: &UploadForm) -> Result<ProcessResponse> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.process_delay).await;
        let script = self.process.lock().expect("process script").pop_front();
        match script {
            Some(ProcessScript::Respond(response)) => Ok(response),
            Some(ProcessScript::Garbage) => {
                Err(ProgressStatus::from_slice(b"<html>")
                    .expect_err("garbage body")
                    .into())
            }
            Some(ProcessScript::Fail) | None => Err(ClientError::Status { status: 502 }),
        }
    }

    async fn fetch_progress(&self) -> Result<ProgressStatus> {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.progress_delay).await;
        let script = self.progress.lock().expect("progress script").pop_front();
        match script {
            Some(ProgressScript::Report(status)) => Ok(status),
            Some(ProgressScript::Fail) => Err(ClientError::Status { status: 503 }),
            None => Ok(ProgressStatus::new("processing", "Processing...")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ViewState {
    pub(crate) error: String,
    pub(crate) error_writes: usize,
    pub(crate) visible: HashMap<PageSection, bool>,
    pub(crate) file_label: String,
    pub(crate) steps: Vec<Step>,
    pub(crate) step_renders: usize,
}

#[derive(Default)]
pub(crate) struct RecordingView {
    state: Mutex<ViewState>,
}

impl RecordingView {
    pub(crate) fn snapshot(&self) -> ViewState {
        self.state.lock().expect("view state").clone()
    }

    pub(crate) fn is_visible(&self, section: PageSection) -> bool {
        self.snapshot()
            .visible
            .get(&section)
            .copied()
            .unwrap_or(false)
    }

    pub(crate) fn error(&self) -> String {
        self.snapshot().error
    }
}

impl PageView for RecordingView {
    fn set_error(&self, message: &str) {
        let mut state = self.state.lock().expect("view state");
        state.error = message.to_string();
        state.error_writes += 1;
    }

    fn set_visible(&self, section: PageSection, visible: bool) {
        self.state
            .lock()
            .expect("view state")
            .visible
            .insert(section, visible);
    }

    fn set_file_label(&self, label: &str) {
        self.state.lock().expect("view state").file_label = label.to_string();
    }

    fn render_steps(&self, steps: &[Step]) {
        let mut state = self.state.lock().expect("view state");
        state.steps = steps.to_vec();
        state.step_renders += 1;
    }
}

pub(crate) type Rendered = Arc<Mutex<BTreeMap<DashboardTarget, String>>>;

/// Bindings for every dashboard target that record the last written text.
pub(crate) fn recording_bindings() -> (ViewBindings, Rendered) {
    let rendered: Rendered = Arc::new(Mutex::new(BTreeMap::new()));
    let mut bindings = ViewBindings::new();
    for target in DashboardTarget::ALL {
        let sink = Arc::clone(&rendered);
        bindings.insert(target, move |text: &str| {
            sink.lock()
                .expect("rendered values")
                .insert(target, text.to_string());
        });
    }
    (bindings, rendered)
}
