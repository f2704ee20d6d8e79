use clap::{Parser, Subcommand, ValueEnum};
use readerlink_apdu_core::TransportMode;
use readerlink_secure_channel::{ROOT_KEY_LENGTH, SecureSession, SessionConfig};
use readerlink_transport_pcsc::PcscDeviceManager;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

mod reader;

#[derive(Parser)]
#[command(version, about = "Open a secure channel to a smart-card reader")]
struct Cli {
    /// Optional reader name to use (will auto-detect if not specified)
    #[arg(short, long, env = "READERLINK_READER")]
    reader: Option<String>,

    /// Trace level output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available readers
    ListReaders,

    /// Establish the secure channel and close it again
    Handshake {
        #[command(flatten)]
        channel: ChannelArgs,
    },

    /// Send APDUs through the secure channel and print the decrypted responses
    Send {
        #[command(flatten)]
        channel: ChannelArgs,

        /// APDUs as hex strings, sent in order
        #[arg(required = true)]
        apdus: Vec<String>,
    },
}

#[derive(clap::Args)]
struct ChannelArgs {
    /// Root key as 64 hex characters (encryption key then MAC key)
    #[arg(
        long,
        env = "READERLINK_KEY",
        hide_env_values = true,
        value_name = "HEX",
        value_parser = parse_root_key
    )]
    key: Zeroizing<Vec<u8>>,

    /// Key access level selecting the reader's key set
    #[arg(long, env = "READERLINK_LEVEL", default_value = "0", value_parser = parse_level)]
    level: u8,

    /// How to address the reader
    #[arg(long, value_enum, default_value_t = Mode::Direct)]
    mode: Mode,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Reader escape channel, no card needed
    Direct,
    /// Exclusive card session
    Card,
}

impl From<Mode> for TransportMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Direct => Self::Direct,
            Mode::Card => Self::Card,
        }
    }
}

/// Accept decimal or `0x`-prefixed hex
fn parse_level(value: &str) -> Result<u8, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid key access level '{value}': {e}"))
}

/// Decode the root key straight into a wiped-on-drop buffer
fn parse_root_key(value: &str) -> Result<Zeroizing<Vec<u8>>, String> {
    let key = Zeroizing::new(
        hex::decode(value.trim()).map_err(|e| format!("root key is not valid hex: {e}"))?,
    );
    if key.len() != ROOT_KEY_LENGTH {
        return Err(format!(
            "root key must be {ROOT_KEY_LENGTH} bytes, got {}",
            key.len()
        ));
    }
    Ok(key)
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "trace" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(true)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let manager = PcscDeviceManager::new()?;

    let (channel, apdus) = match &cli.command {
        Commands::ListReaders => return reader::list_readers(&manager),
        Commands::Handshake { channel } => (channel, None),
        Commands::Send { channel, apdus } => (channel, Some(apdus)),
    };

    // Decode everything before touching the reader
    let apdus = apdus
        .map(|apdus| {
            apdus
                .iter()
                .map(|apdu| hex::decode(apdu.replace(' ', "")))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    let mode = TransportMode::from(channel.mode);
    let transport = reader::open_reader(&manager, cli.reader.as_deref(), mode)?;
    let config = SessionConfig::new()
        .with_transport_mode(mode)
        .with_terminate_on_drop(true);
    let mut session = SecureSession::with_config(transport, config);

    session.establish(&channel.key, channel.level)?;
    info!(level = channel.level, %mode, "Secure channel established");

    match apdus {
        None => println!("Handshake succeeded"),
        Some(apdus) => {
            for apdu in apdus {
                let response = session.send_command(&apdu)?;
                println!("{}", hex::encode_upper(&*response));
            }
        }
    }

    session.terminate();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("0"), Ok(0));
        assert_eq!(parse_level("17"), Ok(17));
        assert_eq!(parse_level("0x1F"), Ok(0x1F));
        assert!(parse_level("256").is_err());
        assert!(parse_level("0xZZ").is_err());
    }

    #[test]
    fn test_parse_root_key() {
        let key = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";
        assert_eq!(parse_root_key(key).unwrap().len(), 32);
        assert!(parse_root_key(&key[..62]).is_err());
        assert!(parse_root_key("not hex").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "readerlink",
            "send",
            "--key",
            "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff",
            "--level",
            "0x02",
            "--mode",
            "card",
            "00A4040000",
            "80CA9F7F00",
        ])
        .unwrap();
        match cli.command {
            Commands::Send { channel, apdus } => {
                assert_eq!(channel.key.len(), 32);
                assert_eq!(channel.key[1], 0x11);
                assert_eq!(channel.level, 2);
                assert!(matches!(channel.mode, Mode::Card));
                assert_eq!(apdus.len(), 2);
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_key() {
        let result = Cli::try_parse_from(["readerlink", "handshake", "--key", "0011"]);
        assert!(result.is_err());
        let message = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("root key must be 32 bytes, got 2"), "{message}");
    }
}
