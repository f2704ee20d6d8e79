//! Device manager for PC/SC operations

use pcsc::{Context, Scope};
use tracing::debug;

use crate::config::PcscConfig;
use crate::error::PcscError;
use crate::reader::PcscReader;
use crate::transport::PcscTransport;

/// Manager for PC/SC device operations
pub struct PcscDeviceManager {
    /// PC/SC context
    context: Context,
}

impl std::fmt::Debug for PcscDeviceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcscDeviceManager").finish_non_exhaustive()
    }
}

impl PcscDeviceManager {
    /// Create a new PC/SC device manager
    pub fn new() -> Result<Self, PcscError> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context })
    }

    /// List all available card readers
    pub fn list_readers(&self) -> Result<Vec<PcscReader>, PcscError> {
        let readers = match self.context.list_readers_owned() {
            Ok(readers) => readers,
            Err(pcsc::Error::NoReadersAvailable) => return Err(PcscError::NoReadersAvailable),
            Err(e) => return Err(e.into()),
        };
        if readers.is_empty() {
            return Err(PcscError::NoReadersAvailable);
        }

        let mut result = Vec::with_capacity(readers.len());
        for reader_name in readers {
            let mut reader_states = vec![pcsc::ReaderState::new(
                reader_name.as_c_str(),
                pcsc::State::UNAWARE,
            )];

            match self.context.get_status_change(None, &mut reader_states) {
                Ok(()) => result.push(PcscReader::from_reader_state(&reader_states[0])),
                Err(e) => {
                    // If we can't get status, assume no card
                    debug!(reader = ?reader_name, error = %e, "Reader status unavailable");
                    result.push(PcscReader::new(
                        reader_name.to_string_lossy().into_owned(),
                        false,
                        None,
                    ));
                }
            }
        }

        Ok(result)
    }

    /// Open a transport to a specific reader
    ///
    /// Nothing is connected yet; the secure session connects in its own mode.
    pub fn open_reader(&self, reader_name: &str) -> Result<PcscTransport, PcscError> {
        self.open_reader_with_config(reader_name, PcscConfig::default())
    }

    /// Open a transport to a specific reader with custom configuration
    pub fn open_reader_with_config(
        &self,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<PcscTransport, PcscError> {
        let readers = self.list_readers()?;
        if !readers.iter().any(|r| r.name() == reader_name) {
            return Err(PcscError::ReaderNotFound(reader_name.to_string()));
        }
        PcscTransport::new(self.context.clone(), reader_name, config)
    }

    /// Open a transport to the first reader with a card present
    pub fn open_first_with_card(&self, config: PcscConfig) -> Result<PcscTransport, PcscError> {
        let readers = self.list_readers()?;
        let reader = readers
            .iter()
            .find(|r| r.has_card())
            .ok_or_else(|| PcscError::NoCard("no reader with a card found".to_string()))?;
        PcscTransport::new(self.context.clone(), reader.name(), config)
    }

    /// Open a transport to the first listed reader, card or not
    pub fn open_first(&self, config: PcscConfig) -> Result<PcscTransport, PcscError> {
        let readers = self.list_readers()?;
        let reader = readers.first().ok_or(PcscError::NoReadersAvailable)?;
        PcscTransport::new(self.context.clone(), reader.name(), config)
    }
}
