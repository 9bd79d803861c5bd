//! Timer-driven progress polling with an explicit lifecycle.
//!
//! A [`ProgressPoller`] is started once per submission and owns its timer.
//! The returned [`PollerHandle`] is the only way to cancel it; dropping the
//! handle cancels as well. Once a stop is requested, responses still in
//! flight are discarded without touching the view.

use std::{sync::Arc, time::Duration};

use shared::protocol::ProgressStatus;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    error::PROGRESS_FALLBACK_MESSAGE,
    steps::StepIndicator,
    view::{PageSection, PageView},
    OcrBackend,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Pause between the completion report and revealing the result section.
    pub completion_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            completion_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed,
    Failed(String),
    TransportFailed(String),
    Cancelled,
}

pub struct ProgressPoller {
    backend: Arc<dyn OcrBackend>,
    view: Arc<dyn PageView>,
    steps: Arc<Mutex<StepIndicator>>,
    config: PollerConfig,
}

impl ProgressPoller {
    pub fn new(
        backend: Arc<dyn OcrBackend>,
        view: Arc<dyn PageView>,
        steps: Arc<Mutex<StepIndicator>>,
        config: PollerConfig,
    ) -> Self {
        Self {
            backend,
            view,
            steps,
            config,
        }
    }

    pub fn start(self) -> PollerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(stop_rx));
        PollerHandle { stop_tx, task }
    }

    async fn run(self, mut stop_rx: watch::Receiver<bool>) -> PollOutcome {
        // First request goes out one interval after start.
        let mut ticker = time::interval_at(
            time::Instant::now() + self.config.interval,
            self.config.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop_requested(&mut stop_rx) => return PollOutcome::Cancelled,
                _ = ticker.tick() => {}
            }

            let report = tokio::select! {
                biased;
                _ = stop_requested(&mut stop_rx) => return PollOutcome::Cancelled,
                report = self.backend.fetch_progress() => report,
            };
            if is_stopped(&stop_rx) {
                debug!("progress: discarding response received after stop");
                return PollOutcome::Cancelled;
            }

            match report {
                Ok(status) => {
                    if let Some(outcome) = self.apply(status, &mut stop_rx).await {
                        return outcome;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "progress: request failed, stopping poller");
                    self.view.set_error(PROGRESS_FALLBACK_MESSAGE);
                    self.view.set_visible(PageSection::Progress, false);
                    return PollOutcome::TransportFailed(err.to_string());
                }
            }
        }
    }

    /// Pushes one report to the step indicator. Returns the terminal outcome
    /// when the report ends polling.
    async fn apply(
        &self,
        status: ProgressStatus,
        stop_rx: &mut watch::Receiver<bool>,
    ) -> Option<PollOutcome> {
        debug!(step = %status.step, details = %status.details, "progress: status received");
        let snapshot = {
            let mut steps = self.steps.lock().await;
            steps.apply(&status);
            steps.steps().to_vec()
        };
        self.view.render_steps(&snapshot);

        if status.is_complete() {
            info!("progress: processing complete, stopping poller");
            tokio::select! {
                biased;
                _ = stop_requested(stop_rx) => {
                    debug!("progress: stopped during completion delay, leaving sections as they are");
                }
                _ = time::sleep(self.config.completion_delay) => {
                    self.view.set_visible(PageSection::Progress, false);
                    self.view.set_visible(PageSection::Result, true);
                }
            }
            return Some(PollOutcome::Completed);
        }

        if status.is_error() {
            warn!(details = %status.details, "progress: backend reported an error");
            self.view.set_error(&status.details);
            self.view.set_visible(PageSection::Progress, false);
            return Some(PollOutcome::Failed(status.details));
        }

        None
    }
}

/// Resolves once a stop was requested or the handle is gone.
async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    let _ = stop_rx.wait_for(|stopped| *stopped).await;
}

fn is_stopped(stop_rx: &watch::Receiver<bool>) -> bool {
    *stop_rx.borrow() || stop_rx.has_changed().is_err()
}

/// Cancellation handle of a running [`ProgressPoller`].
pub struct PollerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<PollOutcome>,
}

impl PollerHandle {
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Waits for the poller task to end and reports how it ended.
    pub async fn finished(self) -> PollOutcome {
        let PollerHandle { stop_tx, task } = self;
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "progress: poller task ended abnormally");
                PollOutcome::Cancelled
            }
        };
        drop(stop_tx);
        outcome
    }
}

#[cfg(test)]
#[path = "tests/poller_tests.rs"]
mod tests;
