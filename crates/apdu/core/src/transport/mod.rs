//! Transport traits for APDU communication with card readers
//!
//! A transport moves raw command and response bytes. It has no knowledge of
//! command structure or secure channels. Readers can be addressed in two ways,
//! see [`TransportMode`].

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

use std::fmt;

use bytes::Bytes;
pub use error::TransportError;
use tracing::{debug, trace};

/// How the reader is addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, derive_more::Display)]
pub enum TransportMode {
    /// Exclusive card session, APDUs go through the regular transmit path
    #[default]
    #[display("card")]
    Card,
    /// Direct connection to the reader, APDUs go through its escape/control channel
    #[display("direct")]
    Direct,
}

/// Trait for reader transports
///
/// Implementations own the connection to one reader. All calls are blocking
/// and strictly request/response; bounding how long a response may take is
/// the implementation's responsibility.
pub trait ReaderTransport: fmt::Debug + Send {
    /// Open the connection in the given mode
    fn connect(&mut self, mode: TransportMode) -> Result<(), TransportError>;

    /// Release the connection. Must be safe to call when already disconnected.
    fn disconnect(&mut self);

    /// Check if the transport currently holds a connection
    fn is_connected(&self) -> bool;

    /// Send raw APDU bytes and return the response bytes, status word included
    fn transmit_raw(&mut self, command: &[u8], mode: TransportMode) -> Result<Bytes, TransportError> {
        trace!(command = %hex::encode(command), %mode, "Transmitting raw command");
        let result = self.do_transmit_raw(command, mode);
        match &result {
            Ok(response) => {
                trace!(response = %hex::encode(response), "Received raw response");
            }
            Err(e) => {
                debug!(error = ?e, "Transport error during transmission");
            }
        }
        result
    }

    /// Internal implementation of transmit_raw
    /// This is the method that concrete implementations should override
    fn do_transmit_raw(&mut self, command: &[u8], mode: TransportMode)
    -> Result<Bytes, TransportError>;
}
