use super::*;
use crate::{
    error::PROGRESS_FALLBACK_MESSAGE,
    steps::StepState,
    test_support::{RecordingView, ScriptedBackend},
};
use shared::protocol::ReportedStatus;

fn start(backend: &Arc<ScriptedBackend>, view: &Arc<RecordingView>) -> PollerHandle {
    ProgressPoller::new(
        Arc::clone(backend) as Arc<dyn OcrBackend>,
        Arc::clone(view) as Arc<dyn PageView>,
        Arc::new(Mutex::new(StepIndicator::default())),
        PollerConfig::default(),
    )
    .start()
}

#[tokio::test(start_paused = true)]
async fn first_request_waits_one_interval() {
    let backend = Arc::new(ScriptedBackend::new());
    let view = Arc::new(RecordingView::default());
    let handle = start(&backend, &view);

    time::sleep(Duration::from_millis(900)).await;
    assert_eq!(backend.progress_calls(), 0);

    time::sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.progress_calls(), 1);

    time::sleep(Duration::from_secs(2)).await;
    assert_eq!(backend.progress_calls(), 3);

    handle.stop();
    assert_eq!(handle.finished().await, PollOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn reports_drive_the_step_indicator() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .report(ProgressStatus::new("split", "Splitting PDF into sections"))
            .report(ProgressStatus::new("analyze", "Processing section 2")),
    );
    let view = Arc::new(RecordingView::default());
    let handle = start(&backend, &view);

    time::sleep(Duration::from_millis(2500)).await;

    let steps = view.snapshot().steps;
    assert_eq!(steps[0].state, StepState::Completed);
    assert_eq!(steps[1].state, StepState::Completed);
    assert_eq!(steps[2].state, StepState::Active);
    assert_eq!(steps[2].details.as_deref(), Some("Processing section 2"));
    assert_eq!(steps[3].state, StepState::Pending);
    assert_eq!(view.snapshot().step_renders, 2);

    handle.stop();
    handle.finished().await;
}

#[tokio::test(start_paused = true)]
async fn completion_reveals_result_after_delay() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .report(ProgressStatus::new("complete", "Complete!").with_status(ReportedStatus::Complete)),
    );
    let view = Arc::new(RecordingView::default());
    view.set_visible(PageSection::Progress, true);
    let handle = start(&backend, &view);

    time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(backend.progress_calls(), 1);
    assert!(view.is_visible(PageSection::Progress));
    assert!(!view.is_visible(PageSection::Result));

    time::sleep(Duration::from_secs(1)).await;
    assert!(!view.is_visible(PageSection::Progress));
    assert!(view.is_visible(PageSection::Result));
    assert!(!handle.is_running());
    assert_eq!(handle.finished().await, PollOutcome::Completed);

    time::sleep(Duration::from_secs(5)).await;
    assert_eq!(backend.progress_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn completion_by_status_alone_also_ends_polling() {
    let backend = Arc::new(ScriptedBackend::new().report(
        ProgressStatus::new("process", "Processing with GPT").with_status(ReportedStatus::Complete),
    ));
    let view = Arc::new(RecordingView::default());
    let handle = start(&backend, &view);

    assert_eq!(handle.finished().await, PollOutcome::Completed);
    assert!(view.is_visible(PageSection::Result));
}

#[tokio::test(start_paused = true)]
async fn stop_during_completion_delay_keeps_sections() {
    let backend = Arc::new(
        ScriptedBackend::new().report(ProgressStatus::new("complete", "Complete!")),
    );
    let view = Arc::new(RecordingView::default());
    view.set_visible(PageSection::Progress, true);
    let handle = start(&backend, &view);

    time::sleep(Duration::from_millis(1500)).await;
    handle.stop();

    assert_eq!(handle.finished().await, PollOutcome::Completed);
    assert!(view.is_visible(PageSection::Progress));
    assert!(!view.is_visible(PageSection::Result));
}

#[tokio::test(start_paused = true)]
async fn error_status_stops_polling_and_shows_details() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .report(ProgressStatus::new("analyze", "Processing section 1"))
            .report(
                ProgressStatus::new("error", "ERROR - failed to analyze section3")
                    .with_status(ReportedStatus::Error),
            ),
    );
    let view = Arc::new(RecordingView::default());
    view.set_visible(PageSection::Progress, true);
    let handle = start(&backend, &view);

    assert_eq!(
        handle.finished().await,
        PollOutcome::Failed("ERROR - failed to analyze section3".to_string())
    );
    assert_eq!(view.error(), "ERROR - failed to analyze section3");
    assert!(!view.is_visible(PageSection::Progress));

    time::sleep(Duration::from_secs(5)).await;
    assert_eq!(backend.progress_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn transport_failure_uses_generic_message() {
    let backend = Arc::new(ScriptedBackend::new().progress_failure());
    let view = Arc::new(RecordingView::default());
    view.set_visible(PageSection::Progress, true);
    let handle = start(&backend, &view);

    let outcome = handle.finished().await;
    assert!(matches!(outcome, PollOutcome::TransportFailed(_)));
    assert_eq!(view.error(), PROGRESS_FALLBACK_MESSAGE);
    assert!(!view.is_visible(PageSection::Progress));

    time::sleep(Duration::from_secs(5)).await;
    assert_eq!(backend.progress_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn response_arriving_after_stop_is_discarded() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .report(
                ProgressStatus::new("error", "late failure").with_status(ReportedStatus::Error),
            )
            .progress_delay(Duration::from_millis(500)),
    );
    let view = Arc::new(RecordingView::default());
    let handle = start(&backend, &view);

    // request is in flight between 1.0s and 1.5s
    time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(backend.progress_calls(), 1);
    handle.stop();

    assert_eq!(handle.finished().await, PollOutcome::Cancelled);
    time::sleep(Duration::from_secs(2)).await;
    let state = view.snapshot();
    assert_eq!(state.step_renders, 0);
    assert_eq!(state.error_writes, 0);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_polling() {
    let backend = Arc::new(ScriptedBackend::new());
    let view = Arc::new(RecordingView::default());
    drop(start(&backend, &view));

    time::sleep(Duration::from_secs(3)).await;
    assert_eq!(backend.progress_calls(), 0);
}
