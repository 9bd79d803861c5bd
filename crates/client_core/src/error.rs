use shared::error::DecodeError;
use thiserror::Error;

pub const NO_FILE_MESSAGE: &str = "Please select a file";
pub const PROCESS_FALLBACK_MESSAGE: &str = "Error processing file";
pub const PROGRESS_FALLBACK_MESSAGE: &str = "Error checking progress";
pub const MALFORMED_RESPONSE_MESSAGE: &str = "Unexpected response from server";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),
    #[error("server reported error: {0}")]
    Server(String),
    #[error("progress reported error: {0}")]
    Progress(String),
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },
    #[error("malformed response: {0}")]
    Decode(#[from] DecodeError),
    #[error("invalid server url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// Text shown in the shared error display for this failure.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(message) => message.clone(),
            ClientError::Server(message) | ClientError::Progress(message)
                if !message.is_empty() =>
            {
                message.clone()
            }
            ClientError::Decode(_) => MALFORMED_RESPONSE_MESSAGE.to_string(),
            _ => PROCESS_FALLBACK_MESSAGE.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }
}
