//! Submission handling: validation, section visibility, the upload request
//! and the poller that runs alongside it.

use std::sync::Arc;

use shared::{domain::FormResult, protocol::ProcessResponse};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    dashboard::DashboardRenderer,
    error::{ClientError, NO_FILE_MESSAGE},
    poller::{PollOutcome, PollerHandle, ProgressPoller},
    steps::StepIndicator,
    view::{PageSection, PageView, ViewBindings},
    ClientConfig, OcrBackend, SelectedFile, UploadForm,
};

/// File-chooser label shown while no file is selected.
pub const FILE_PLACEHOLDER: &str = "Choose PDF file";

#[derive(Debug)]
pub enum SubmissionOutcome {
    Completed(FormResult),
    /// The request was made and failed.
    Failed(ClientError),
    /// Rejected before any request was made.
    Rejected(ClientError),
}

impl SubmissionOutcome {
    pub fn form(&self) -> Option<&FormResult> {
        match self {
            SubmissionOutcome::Completed(form) => Some(form),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ClientError> {
        match self {
            SubmissionOutcome::Completed(_) => None,
            SubmissionOutcome::Failed(err) | SubmissionOutcome::Rejected(err) => Some(err),
        }
    }
}

pub struct UploadController {
    backend: Arc<dyn OcrBackend>,
    view: Arc<dyn PageView>,
    bindings: Arc<ViewBindings>,
    renderer: DashboardRenderer,
    steps: Arc<Mutex<StepIndicator>>,
    config: ClientConfig,
    poller: Mutex<Option<PollerHandle>>,
}

impl UploadController {
    pub fn new(
        backend: Arc<dyn OcrBackend>,
        view: Arc<dyn PageView>,
        bindings: Arc<ViewBindings>,
        config: ClientConfig,
    ) -> Self {
        Self {
            backend,
            view,
            bindings,
            renderer: DashboardRenderer::default(),
            steps: Arc::new(Mutex::new(StepIndicator::default())),
            config,
            poller: Mutex::new(None),
        }
    }

    pub fn with_renderer(mut self, renderer: DashboardRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_steps(mut self, steps: StepIndicator) -> Self {
        self.steps = Arc::new(Mutex::new(steps));
        self
    }

    pub fn step_indicator(&self) -> Arc<Mutex<StepIndicator>> {
        Arc::clone(&self.steps)
    }

    pub fn on_file_selected(&self, file: Option<&SelectedFile>) {
        let label = file.map(|file| file.name.as_str()).unwrap_or(FILE_PLACEHOLDER);
        self.view.set_file_label(label);
    }

    pub async fn poller_running(&self) -> bool {
        self.poller
            .lock()
            .await
            .as_ref()
            .is_some_and(PollerHandle::is_running)
    }

    pub async fn submit(&self, form: UploadForm) -> SubmissionOutcome {
        if let Err(err) = self.validate(&form) {
            debug!(error = %err, "submit: rejected before upload");
            self.view.set_error(&err.user_message());
            return SubmissionOutcome::Rejected(err);
        }

        self.view.set_error("");
        self.view.set_visible(PageSection::Upload, false);
        self.view.set_visible(PageSection::Progress, true);
        self.view.set_visible(PageSection::Result, false);
        self.reset_steps().await;
        self.start_poller().await;

        match self.backend.submit(&form).await {
            Ok(ProcessResponse::Completed(result)) => {
                info!(sections = result.sections.len(), "submit: processing finished");
                self.stop_poller().await;
                self.view.set_visible(PageSection::Progress, false);
                self.view.set_visible(PageSection::Result, true);
                self.renderer.render(&result, &self.bindings);
                SubmissionOutcome::Completed(result)
            }
            Ok(ProcessResponse::Failed { message }) => {
                self.fail(ClientError::Server(message)).await
            }
            Err(err) => self.fail(err).await,
        }
    }

    fn validate(&self, form: &UploadForm) -> Result<(), ClientError> {
        let Some(file) = form.file.as_ref() else {
            return Err(ClientError::Validation(NO_FILE_MESSAGE.to_string()));
        };
        if let Some(limit) = self.config.max_upload_bytes {
            if file.size() > limit {
                return Err(ClientError::Validation(format!(
                    "File is too large ({} bytes); the limit is {limit} bytes",
                    file.size()
                )));
            }
        }
        Ok(())
    }

    async fn fail(&self, err: ClientError) -> SubmissionOutcome {
        warn!(error = %err, "submit: processing failed");
        self.stop_poller().await;
        self.view.set_error(&err.user_message());
        self.view.set_visible(PageSection::Upload, true);
        self.view.set_visible(PageSection::Progress, false);
        self.view.set_visible(PageSection::Result, false);
        SubmissionOutcome::Failed(err)
    }

    async fn reset_steps(&self) {
        let snapshot = {
            let mut steps = self.steps.lock().await;
            steps.reset();
            steps.steps().to_vec()
        };
        self.view.render_steps(&snapshot);
    }

    async fn start_poller(&self) {
        let mut slot = self.poller.lock().await;
        if let Some(previous) = slot.take() {
            previous.stop();
            let outcome = previous.finished().await;
            debug!(?outcome, "submit: stopped poller left from previous submission");
        }
        let poller = ProgressPoller::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.view),
            Arc::clone(&self.steps),
            self.config.poller(),
        );
        *slot = Some(poller.start());
    }

    async fn stop_poller(&self) -> Option<PollOutcome> {
        let handle = self.poller.lock().await.take()?;
        handle.stop();
        let outcome = handle.finished().await;
        debug!(?outcome, "submit: poller stopped");
        Some(outcome)
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
