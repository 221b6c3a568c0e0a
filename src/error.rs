//! Typed failures surfaced to the view-model.

use thiserror::Error;

/// Why a chat request produced no reply
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Connection refused, reset, or the body stream broke
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response could not be interpreted
    #[error("Could not decode response: {0}")]
    Decode(String),

    /// Attachment could not be packaged for the request
    #[error("Attachment error: {0}")]
    Attachment(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DispatchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            DispatchError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            DispatchError::Network(err.to_string())
        }
    }
}

/// Input rejected before anything is sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Type a message or attach a document before sending.")]
    Empty,

    #[error("Still waiting for the model's response.")]
    Busy,

    #[error("Please select a PDF, DOCX, DOC, or TXT file ({0} is not supported).")]
    UnsupportedFile(String),

    #[error("Could not read {path}: {reason}")]
    Unreadable { path: String, reason: String },
}
