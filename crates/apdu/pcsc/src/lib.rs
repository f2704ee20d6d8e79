//! PC/SC transport for readerlink
//!
//! This crate implements [`ReaderTransport`](readerlink_apdu_core::ReaderTransport)
//! on top of the PC/SC API. Card mode opens an exclusive card session; direct
//! mode talks to the reader through its escape channel (`SCARD_CTL_CODE(3500)`
//! by default) and works without a card present.
//!
//! # Examples
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use readerlink_apdu_core::{ReaderTransport, TransportMode};
//! use readerlink_transport_pcsc::{PcscConfig, PcscDeviceManager};
//!
//! let manager = PcscDeviceManager::new()?;
//! for reader in manager.list_readers()? {
//!     println!("{} (card: {})", reader.name(), reader.has_card());
//! }
//!
//! let mut transport = manager.open_first(PcscConfig::default())?;
//! transport.connect(TransportMode::Direct)?;
//! let response = transport.transmit_raw(&[0xFF, 0x72, 0x00, 0x01, 0x00], TransportMode::Direct)?;
//! println!("{response:02X?}");
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

mod config;
mod error;
mod manager;
mod reader;
mod transport;

pub use config::{DEFAULT_CONTROL_FUNCTION, Disposition, PcscConfig};
pub use error::PcscError;
pub use manager::PcscDeviceManager;
pub use reader::PcscReader;
pub use transport::PcscTransport;

// Re-export some pcsc types for convenience
pub use pcsc::{Protocol, Protocols};
