//! Error types specific to APDU responses

use super::status::StatusWord;

/// A response that completed with a status other than `90 00`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Status error {status} ({})", .status.description())]
pub struct StatusError {
    /// Status word returned by the reader
    pub status: StatusWord,
}

impl From<StatusWord> for StatusError {
    fn from(status: StatusWord) -> Self {
        Self { status }
    }
}

/// Error for APDU response processing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseError {
    /// Incomplete response (less than 2 bytes)
    #[error("Incomplete response")]
    Incomplete,
}
