//! PC/SC transport implementation
//!
//! Card mode connects with exclusive sharing and uses the regular transmit
//! path. Direct mode connects to the reader itself, no card required, and
//! passes commands through the reader's escape channel.

use std::ffi::CString;
use std::fmt;

use bytes::Bytes;
use pcsc::{Card, Context, Protocols, ShareMode};
use readerlink_apdu_core::{ReaderTransport, TransportError, TransportMode};
use tracing::{debug, warn};

use crate::{config::PcscConfig, error::PcscError};

/// Transport implementation using PC/SC
pub struct PcscTransport {
    /// PC/SC context
    context: Context,
    /// Reader name
    reader_name: String,
    /// Connection and the mode it was opened in
    connection: Option<(Card, TransportMode)>,
    /// Configuration
    config: PcscConfig,
}

impl fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTransport")
            .field("reader_name", &self.reader_name)
            .field("mode", &self.mode())
            .field("config", &self.config)
            .finish()
    }
}

impl PcscTransport {
    pub(crate) fn new(
        context: Context,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<Self, PcscError> {
        Ok(Self {
            context,
            reader_name: reader_name.to_string(),
            connection: None,
            config,
        })
    }

    /// Get the reader name
    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    /// Mode of the open connection, if any
    pub fn mode(&self) -> Option<TransportMode> {
        self.connection.as_ref().map(|(_, mode)| *mode)
    }

    /// Get the ATR of the connected card
    pub fn atr(&self) -> Result<Vec<u8>, PcscError> {
        match &self.connection {
            Some((card, TransportMode::Card)) => Ok(card.get_attribute_owned(pcsc::Attribute::AtrString)?),
            _ => Err(PcscError::NoCard(self.reader_name.clone())),
        }
    }

    fn open(&mut self, mode: TransportMode) -> Result<(), PcscError> {
        let reader = CString::new(self.reader_name.clone())
            .map_err(|_| PcscError::ReaderNotFound(self.reader_name.clone()))?;

        let (share_mode, protocols) = match mode {
            TransportMode::Card => (ShareMode::Exclusive, self.config.protocols),
            TransportMode::Direct => (ShareMode::Direct, Protocols::UNDEFINED),
        };

        let card = match self.context.connect(&reader, share_mode, protocols) {
            Ok(card) => card,
            Err(pcsc::Error::NoSmartcard) => return Err(PcscError::NoCard(self.reader_name.clone())),
            Err(pcsc::Error::UnknownReader) => {
                return Err(PcscError::ReaderNotFound(self.reader_name.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        debug!(reader = %self.reader_name, %mode, "Connected");
        self.connection = Some((card, mode));
        Ok(())
    }

    fn release(&mut self) {
        if let Some((card, mode)) = self.connection.take() {
            if let Err((_, e)) = card.disconnect(self.config.disposition.into()) {
                warn!(reader = %self.reader_name, %mode, error = %e, "Disconnect failed");
            }
        }
    }

    fn exchange(&mut self, command: &[u8], mode: TransportMode) -> Result<Bytes, PcscError> {
        // SCARD_CTL_CODE(function); the width of DWORD differs between platforms
        let control_code = pcsc::ctl_code(self.config.control_function.into());
        let mut buffer = vec![0u8; self.config.buffer_size];

        let result = match &self.connection {
            Some((card, open_mode)) if *open_mode == mode => match mode {
                TransportMode::Card => card.transmit(command, &mut buffer),
                TransportMode::Direct => card.control(control_code, command, &mut buffer),
            }
            .map(Bytes::copy_from_slice),
            _ => return Err(PcscError::NotConnected(self.reader_name.clone())),
        };

        result.map_err(|e| {
            if invalidates_handle(&e) {
                debug!(reader = %self.reader_name, error = %e, "Card handle lost");
                self.connection = None;
            }
            e.into()
        })
    }
}

/// Errors after which the card handle can no longer be used
///
/// The command is not resent: whether the reader processed it is unknown, so
/// the caller has to treat the exchange as failed.
const fn invalidates_handle(error: &pcsc::Error) -> bool {
    matches!(error, pcsc::Error::RemovedCard | pcsc::Error::ResetCard)
}

impl ReaderTransport for PcscTransport {
    fn connect(&mut self, mode: TransportMode) -> Result<(), TransportError> {
        match self.mode() {
            Some(open_mode) if open_mode == mode => return Ok(()),
            Some(_) => self.release(),
            None => {}
        }
        self.open(mode).map_err(TransportError::from)
    }

    fn disconnect(&mut self) {
        self.release();
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn do_transmit_raw(
        &mut self,
        command: &[u8],
        mode: TransportMode,
    ) -> Result<Bytes, TransportError> {
        self.exchange(command, mode).map_err(TransportError::from)
    }
}

impl Drop for PcscTransport {
    fn drop(&mut self) {
        self.release();
    }
}
