//! Scripted transport for tests
//!
//! Responses are replayed in order; every command is recorded together with
//! the mode it was sent in.

use std::collections::VecDeque;

use bytes::Bytes;

use super::{ReaderTransport, TransportError, TransportMode};

/// Mock transport for testing
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    /// Responses to return, in order
    pub responses: VecDeque<Result<Bytes, TransportError>>,
    /// Commands that were sent, with the mode used
    pub commands: Vec<(Bytes, TransportMode)>,
    /// Mode of the current connection, if any
    pub connection: Option<TransportMode>,
    /// Number of successful `connect` calls
    pub connects: usize,
    /// Number of `disconnect` calls that released a connection
    pub disconnects: usize,
    /// Make the next `connect` call fail
    pub fail_connect: bool,
}

impl MockTransport {
    /// Create a new mock transport with the given responses
    pub fn new(responses: Vec<Bytes>) -> Self {
        Self {
            responses: responses.into_iter().map(Ok).collect(),
            ..Default::default()
        }
    }

    /// Create a mock transport whose `connect` fails
    pub fn failing_connect() -> Self {
        Self {
            fail_connect: true,
            ..Default::default()
        }
    }

    /// Queue another response
    pub fn push_response(&mut self, response: impl Into<Bytes>) {
        self.responses.push_back(Ok(response.into()));
    }

    /// Queue a transport failure
    pub fn push_error(&mut self, error: TransportError) {
        self.responses.push_back(Err(error));
    }

    /// Raw bytes of every command sent so far
    pub fn sent(&self) -> Vec<Bytes> {
        self.commands.iter().map(|(c, _)| c.clone()).collect()
    }
}

impl ReaderTransport for MockTransport {
    fn connect(&mut self, mode: TransportMode) -> Result<(), TransportError> {
        if self.fail_connect {
            return Err(TransportError::Connection);
        }
        self.connection = Some(mode);
        self.connects += 1;
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            self.disconnects += 1;
        }
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn do_transmit_raw(
        &mut self,
        command: &[u8],
        mode: TransportMode,
    ) -> Result<Bytes, TransportError> {
        if self.connection.is_none() {
            return Err(TransportError::NotConnected);
        }

        self.commands.push((Bytes::copy_from_slice(command), mode));

        self.responses
            .pop_front()
            .unwrap_or(Err(TransportError::Transmission))
    }
}
