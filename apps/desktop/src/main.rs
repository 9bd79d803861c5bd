use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    DashboardTarget, HttpOcrBackend, PageSection, PageView, SelectedFile, Step, StepState,
    SubmissionOutcome, UploadController, UploadForm, ViewBindings,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;

/// Upload a scanned claim form for OCR and print the extracted fields.
#[derive(Parser, Debug)]
#[command(name = "ocr-review")]
struct Args {
    /// PDF to upload.
    pdf: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    /// Settings file; defaults to ./ocr_review.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Extra form field sent with the upload, as KEY=VALUE.
    #[arg(long = "field", value_parser = parse_field)]
    fields: Vec<(String, String)>,
    /// Write the extracted form here as JSON.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

/// Prints the progress section to stdout and errors to stderr.
#[derive(Default)]
struct TerminalView {
    last_step_line: Mutex<Option<String>>,
}

impl PageView for TerminalView {
    fn set_error(&self, message: &str) {
        if !message.is_empty() {
            eprintln!("error: {message}");
        }
    }

    fn set_visible(&self, section: PageSection, visible: bool) {
        debug!(section = section.element_id(), visible, "view: visibility changed");
    }

    fn set_file_label(&self, label: &str) {
        println!("file: {label}");
    }

    fn render_steps(&self, steps: &[Step]) {
        let Some(line) = step_line(steps) else {
            return;
        };
        let Ok(mut last) = self.last_step_line.lock() else {
            return;
        };
        if last.as_deref() != Some(line.as_str()) {
            println!("{line}");
            *last = Some(line);
        }
    }
}

fn step_line(steps: &[Step]) -> Option<String> {
    let (index, step) = steps
        .iter()
        .enumerate()
        .find(|(_, step)| step.state == StepState::Active)?;
    let mut line = format!("[{}/{}] {}", index + 1, steps.len(), step.title);
    if let Some(details) = step.details.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(": ");
        line.push_str(details);
    }
    Some(line)
}

fn terminal_bindings() -> ViewBindings {
    let mut bindings = ViewBindings::new();
    for target in DashboardTarget::ALL {
        bindings.insert(target, move |text: &str| {
            println!("{}: {text}", target.caption());
        });
    }
    bindings
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings(args.config.as_deref())?;
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    let client_config = settings.client_config();
    let backend = HttpOcrBackend::new(&settings.server_url, client_config.clone())
        .with_context(|| format!("invalid server url {}", settings.server_url))?;
    info!(server_url = %backend.server_url(), "ocr-review: using OCR service");

    let file = SelectedFile::read(&args.pdf)
        .await
        .with_context(|| format!("failed to read {}", args.pdf.display()))?;

    let controller = UploadController::new(
        Arc::new(backend),
        Arc::new(TerminalView::default()),
        Arc::new(terminal_bindings()),
        client_config,
    );
    controller.on_file_selected(Some(&file));

    let form = args
        .fields
        .into_iter()
        .fold(UploadForm::with_file(file), |form, (key, value)| {
            form.field(key, value)
        });

    match controller.submit(form).await {
        SubmissionOutcome::Completed(result) => {
            if let Some(path) = args.output {
                let json = serde_json::to_string_pretty(&result)?;
                tokio::fs::write(&path, json)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(path = %path.display(), "ocr-review: saved extracted form");
            }
            Ok(())
        }
        outcome => {
            let message = outcome
                .error()
                .map(|err| err.user_message())
                .unwrap_or_default();
            bail!("processing failed: {message}")
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
