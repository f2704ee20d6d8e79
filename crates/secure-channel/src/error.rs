//! Error types for the secure channel

use readerlink_apdu_core::{CommandError, ResponseError, StatusWord, TransportError};

use crate::session::Status;

/// Result type for secure channel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Step of the channel an error occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Phase {
    /// Validating the root key and opening the transport
    #[display("open")]
    Open,
    /// GET CHALLENGE
    #[display("challenge")]
    Challenge,
    /// MUTUAL AUTHENTICATE request
    #[display("mutual authentication")]
    MutualAuthentication,
    /// Verification of the reader's authentication response
    #[display("verification")]
    Verification,
    /// A protected command exchange
    #[display("secure command")]
    SecureCommand,
}

/// Broad class of an error, deciding what happened to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ErrorKind {
    /// Bad input or wrong state; the session was left untouched
    #[display("precondition")]
    Precondition,
    /// The reader could not be reached or answered with an error or garbage
    #[display("transport")]
    Transport,
    /// A tag or nonce did not verify
    #[display("verification")]
    Verification,
}

/// Error type for secure channel operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-related errors
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Response-related errors
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// Command-related errors
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Root key is not 16 + 16 bytes
    #[error("Invalid root key length: {0} bytes, expected 32")]
    InvalidKeyLength(usize),

    /// Command payload does not fit a SECURE COMMAND
    #[error("Payload too long: {length} bytes (max {max})")]
    PayloadTooLong {
        /// Length of the rejected APDU
        length: usize,
        /// Largest APDU a secure command can carry
        max: usize,
    },

    /// Handshake step attempted before a root key was loaded
    #[error("Secure channel not opened")]
    NotOpened,

    /// Operation not allowed in the current state
    #[error("Invalid state: expected {expected}, session is {actual}")]
    InvalidState {
        /// State the operation requires
        expected: Status,
        /// State the session is in
        actual: Status,
    },

    /// The reader answered with a non-success status word
    #[error("Reader returned status {status} ({}) during {phase}", .status.description())]
    Status {
        /// Step that received the status
        phase: Phase,
        /// Status word returned
        status: StatusWord,
    },

    /// Response body had the wrong shape
    #[error("Malformed response during {phase}: {reason}")]
    MalformedResponse {
        /// Step that received the response
        phase: Phase,
        /// What was wrong with it
        reason: &'static str,
    },

    /// Tag or nonce check failed
    #[error("Authentication failed during {phase}: {reason}")]
    AuthenticationFailed {
        /// Step whose check failed
        phase: Phase,
        /// Which check failed
        reason: &'static str,
    },
}

impl Error {
    /// Classify the error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKeyLength(_)
            | Self::PayloadTooLong { .. }
            | Self::NotOpened
            | Self::InvalidState { .. }
            | Self::Command(_) => ErrorKind::Precondition,
            Self::Transport(_)
            | Self::Response(_)
            | Self::Status { .. }
            | Self::MalformedResponse { .. } => ErrorKind::Transport,
            Self::AuthenticationFailed { .. } => ErrorKind::Verification,
        }
    }

    /// Whether the error is a security event
    pub const fn is_verification(&self) -> bool {
        matches!(self.kind(), ErrorKind::Verification)
    }

    pub(crate) const fn status(phase: Phase, status: StatusWord) -> Self {
        Self::Status { phase, status }
    }

    pub(crate) const fn malformed(phase: Phase, reason: &'static str) -> Self {
        Self::MalformedResponse { phase, reason }
    }

    pub(crate) const fn authentication(phase: Phase, reason: &'static str) -> Self {
        Self::AuthenticationFailed { phase, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        assert_eq!(Error::InvalidKeyLength(31).kind(), ErrorKind::Precondition);
        assert_eq!(
            Error::InvalidState {
                expected: Status::Established,
                actual: Status::NotEstablished
            }
            .kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            Error::from(TransportError::Timeout).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            Error::status(Phase::Challenge, StatusWord::new(0x6A, 0x86)).kind(),
            ErrorKind::Transport
        );
        assert!(Error::authentication(Phase::Verification, "tag mismatch").is_verification());
    }

    #[test]
    fn test_display() {
        let error = Error::status(Phase::Challenge, StatusWord::new(0x6A, 0x86));
        let message = error.to_string();
        assert!(message.contains("6A 86"), "{message}");
        assert!(message.contains("challenge"), "{message}");

        assert_eq!(
            Error::InvalidKeyLength(31).to_string(),
            "Invalid root key length: 31 bytes, expected 32"
        );
        assert_eq!(
            Error::PayloadTooLong {
                length: 240,
                max: 239
            }
            .to_string(),
            "Payload too long: 240 bytes (max 239)"
        );
        assert_eq!(
            Error::InvalidState {
                expected: Status::Established,
                actual: Status::ChallengeSent
            }
            .to_string(),
            "Invalid state: expected established, session is challenge sent"
        );
        assert_eq!(
            Error::malformed(Phase::Verification, "wrong length").to_string(),
            "Malformed response during verification: wrong length"
        );
    }
}
