//! Configuration options for PC/SC transport

use pcsc::{Disposition as PcscDisposition, Protocols as PcscProtocols};

/// Reader escape function number of the direct channel
pub const DEFAULT_CONTROL_FUNCTION: u32 = 3500;

/// What happens to the card when the connection is released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Leave the card as it is (default)
    Leave,
    /// Reset the card
    Reset,
    /// Power the card down
    Unpower,
    /// Eject the card, if the reader supports it
    Eject,
}

impl From<Disposition> for PcscDisposition {
    fn from(disposition: Disposition) -> Self {
        match disposition {
            Disposition::Leave => Self::LeaveCard,
            Disposition::Reset => Self::ResetCard,
            Disposition::Unpower => Self::UnpowerCard,
            Disposition::Eject => Self::EjectCard,
        }
    }
}

/// Configuration options for PC/SC transport
#[derive(Debug, Clone)]
pub struct PcscConfig {
    /// Preferred protocols for card sessions
    pub protocols: PcscProtocols,

    /// Disposition applied on disconnect
    pub disposition: Disposition,

    /// Escape function number used by the direct channel, see `SCARD_CTL_CODE`
    pub control_function: u32,

    /// Response buffer size
    pub buffer_size: usize,
}

impl Default for PcscConfig {
    fn default() -> Self {
        Self {
            protocols: PcscProtocols::ANY,
            disposition: Disposition::Leave,
            control_function: DEFAULT_CONTROL_FUNCTION,
            buffer_size: pcsc::MAX_BUFFER_SIZE,
        }
    }
}

impl PcscConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the preferred protocols
    pub const fn with_protocols(mut self, protocols: PcscProtocols) -> Self {
        self.protocols = protocols;
        self
    }

    /// Set the disposition applied on disconnect
    pub const fn with_disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = disposition;
        self
    }

    /// Set the escape function number of the direct channel
    pub const fn with_control_function(mut self, function: u32) -> Self {
        self.control_function = function;
        self
    }

    /// Set the response buffer size
    pub const fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PcscConfig::new();
        assert_eq!(config.disposition, Disposition::Leave);
        assert_eq!(config.control_function, 3500);
        assert_eq!(config.buffer_size, pcsc::MAX_BUFFER_SIZE);
    }

    #[test]
    fn test_builder() {
        let config = PcscConfig::new()
            .with_protocols(PcscProtocols::T1)
            .with_disposition(Disposition::Reset)
            .with_control_function(3400)
            .with_buffer_size(1024);
        assert_eq!(config.protocols, PcscProtocols::T1);
        assert_eq!(config.disposition, Disposition::Reset);
        assert_eq!(config.control_function, 3400);
        assert_eq!(config.buffer_size, 1024);
    }

    #[test]
    fn test_disposition_conversion() {
        assert_eq!(PcscDisposition::from(Disposition::Unpower), PcscDisposition::UnpowerCard);
        assert_eq!(PcscDisposition::from(Disposition::Leave), PcscDisposition::LeaveCard);
    }
}
