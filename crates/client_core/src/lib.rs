use std::{path::Path, time::Duration};

use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use shared::{
    error::DecodeError,
    protocol::{
        ProcessResponse, ProgressStatus, DEFAULT_UPLOAD_FIELD, MAX_UPLOAD_BYTES, PROCESS_PATH,
        PROGRESS_PATH,
    },
};
use tracing::{debug, info, warn};
use url::Url;

pub mod controller;
pub mod dashboard;
pub mod error;
pub mod poller;
pub mod steps;
pub mod view;

pub use controller::{SubmissionOutcome, UploadController, FILE_PLACEHOLDER};
pub use dashboard::{DashboardRenderer, FieldRef, FormLabels};
pub use error::ClientError;
pub use poller::{PollOutcome, PollerConfig, PollerHandle, ProgressPoller};
pub use steps::{Step, StepDefinition, StepIndicator, StepState};
pub use view::{DashboardTarget, PageSection, PageView, ViewBindings};

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

const PDF_MIME_TYPE: &str = "application/pdf";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_COMPLETION_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_PROGRESS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub poll_interval: Duration,
    pub completion_delay: Duration,
    pub process_timeout: Duration,
    pub progress_timeout: Duration,
    pub upload_field: String,
    pub max_upload_bytes: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            completion_delay: DEFAULT_COMPLETION_DELAY,
            process_timeout: DEFAULT_PROCESS_TIMEOUT,
            progress_timeout: DEFAULT_PROGRESS_TIMEOUT,
            upload_field: DEFAULT_UPLOAD_FIELD.to_string(),
            max_upload_bytes: Some(MAX_UPLOAD_BYTES),
        }
    }
}

impl ClientConfig {
    pub fn poller(&self) -> PollerConfig {
        PollerConfig {
            interval: self.poll_interval,
            completion_delay: self.completion_delay,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: PDF_MIME_TYPE.to_string(),
            bytes,
        }
    }

    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::pdf(name, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Contents of the upload form: the chosen file plus any other form fields.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub file: Option<SelectedFile>,
    pub fields: Vec<(String, String)>,
}

impl UploadForm {
    pub fn with_file(file: SelectedFile) -> Self {
        Self {
            file: Some(file),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

/// The two endpoints of the processing service.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    async fn submit(&self, form: &UploadForm) -> Result<ProcessResponse>;
    async fn fetch_progress(&self) -> Result<ProgressStatus>;
}

pub struct HttpOcrBackend {
    http: Client,
    base_url: Url,
    config: ClientConfig,
}

impl HttpOcrBackend {
    pub fn new(server_url: &str, config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(server_url)?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::Validation(format!(
                "server url must start with http:// or https://: {server_url}"
            )));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            config,
        })
    }

    pub fn server_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }
}

#[async_trait]
impl OcrBackend for HttpOcrBackend {
    async fn submit(&self, form: &UploadForm) -> Result<ProcessResponse> {
        let file = form
            .file
            .as_ref()
            .ok_or_else(|| ClientError::Validation(error::NO_FILE_MESSAGE.to_string()))?;

        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)?;
        let mut body = multipart::Form::new().part(self.config.upload_field.clone(), part);
        for (name, value) in &form.fields {
            body = body.text(name.clone(), value.clone());
        }

        info!(
            file = %file.name,
            size_bytes = file.size(),
            extra_fields = form.fields.len(),
            "ocr: uploading document"
        );
        let response = self
            .http
            .post(self.endpoint(PROCESS_PATH))
            .timeout(self.config.process_timeout)
            .multipart(body)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        decode_body(status, &bytes, ProcessResponse::from_slice)
    }

    async fn fetch_progress(&self) -> Result<ProgressStatus> {
        let response = self
            .http
            .get(self.endpoint(PROGRESS_PATH))
            .timeout(self.config.progress_timeout)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        let progress = decode_body(status, &bytes, ProgressStatus::from_slice)?;
        debug!(step = %progress.step, "ocr: progress fetched");
        Ok(progress)
    }
}

/// Error statuses still carry JSON bodies worth decoding; only an
/// undecodable body on an error status is reported as a status failure.
fn decode_body<T>(
    status: StatusCode,
    bytes: &[u8],
    decode: impl FnOnce(&[u8]) -> std::result::Result<T, DecodeError>,
) -> Result<T> {
    match decode(bytes) {
        Ok(decoded) => Ok(decoded),
        Err(err) if !status.is_success() => {
            warn!(status = status.as_u16(), error = %err, "ocr: undecodable error response");
            Err(ClientError::Status {
                status: status.as_u16(),
            })
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
