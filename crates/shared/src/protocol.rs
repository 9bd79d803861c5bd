use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{FormResult, StepId},
    error::DecodeError,
};

pub const PROCESS_PATH: &str = "/process";
pub const PROGRESS_PATH: &str = "/progress";
/// Multipart field the processing endpoint reads the PDF from.
pub const DEFAULT_UPLOAD_FIELD: &str = "pdf";
/// Request body limit enforced by the processing endpoint.
pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;
pub const COMPLETE_STEP: &str = "complete";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportedStatus {
    Complete,
    Error,
    #[serde(other)]
    Other,
}

/// Body of `GET /progress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressStatus {
    pub step: StepId,
    #[serde(default)]
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReportedStatus>,
}

impl ProgressStatus {
    pub fn new(step: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            step: StepId(step.into()),
            details: details.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: ReportedStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn is_complete(&self) -> bool {
        self.step.as_str() == COMPLETE_STEP || self.status == Some(ReportedStatus::Complete)
    }

    pub fn is_error(&self) -> bool {
        self.status == Some(ReportedStatus::Error)
    }
}

/// Decoded body of `POST /process`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessResponse {
    Failed { message: String },
    Completed(FormResult),
}

impl ProcessResponse {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    /// A truthy `error` member wins over any form data in the same body.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        if let Some(message) = value.get("error").and_then(error_message) {
            return Ok(ProcessResponse::Failed { message });
        }
        FormResult::from_value(value).map(ProcessResponse::Completed)
    }
}

fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
