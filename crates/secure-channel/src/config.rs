//! Configuration options for a secure session

use readerlink_apdu_core::TransportMode;

/// Configuration options for [`SecureSession`](crate::SecureSession)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How the reader is addressed for the whole session
    pub transport_mode: TransportMode,

    /// Terminate an established channel when the session is dropped
    pub terminate_on_drop: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transport_mode: TransportMode::Direct,
            terminate_on_drop: false,
        }
    }
}

impl SessionConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transport mode
    pub const fn with_transport_mode(mut self, mode: TransportMode) -> Self {
        self.transport_mode = mode;
        self
    }

    /// Set whether dropping the session terminates the channel
    pub const fn with_terminate_on_drop(mut self, terminate_on_drop: bool) -> Self {
        self.terminate_on_drop = terminate_on_drop;
        self
    }
}
