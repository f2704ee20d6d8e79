//! Reader selection helpers

use readerlink_apdu_core::TransportMode;
use readerlink_transport_pcsc::{PcscConfig, PcscDeviceManager, PcscTransport};
use tracing::info;

/// List all available readers
pub(crate) fn list_readers(manager: &PcscDeviceManager) -> Result<(), Box<dyn std::error::Error>> {
    let readers = manager.list_readers()?;

    println!("Available readers:");
    for (i, reader) in readers.iter().enumerate() {
        let status = if reader.has_card() {
            "card present"
        } else {
            "no card"
        };
        println!("{}. {} ({})", i + 1, reader.name(), status);
    }

    Ok(())
}

/// Open the named reader, or pick one suited to the transport mode
///
/// Card mode needs a card in the reader; direct mode takes the first reader.
pub(crate) fn open_reader(
    manager: &PcscDeviceManager,
    reader_name: Option<&str>,
    mode: TransportMode,
) -> Result<PcscTransport, Box<dyn std::error::Error>> {
    let config = PcscConfig::default();
    let transport = match (reader_name, mode) {
        (Some(name), _) => manager.open_reader_with_config(name, config)?,
        (None, TransportMode::Card) => manager.open_first_with_card(config)?,
        (None, TransportMode::Direct) => manager.open_first(config)?,
    };

    info!("Using reader: {}", transport.reader_name());
    Ok(transport)
}
