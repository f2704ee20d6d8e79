//! Mutually authenticated secure channel between a host and a smart-card reader
//!
//! The channel is opened with a 32-byte root key shared with the reader. A
//! four-step handshake (GET CHALLENGE, MUTUAL AUTHENTICATE) proves possession
//! of the root key on both sides and derives fresh session keys from key
//! shares contributed by each side. Every APDU sent afterwards is sealed with
//! AES-SIV under the session keys, using a 128-bit replay counter as the
//! associated data.
//!
//! ```no_run
//! use readerlink_secure_channel::{SecureSession, SessionConfig};
//! # fn run<T: readerlink_secure_channel::ReaderTransport>(transport: T) -> readerlink_secure_channel::Result<()> {
//! let mut session = SecureSession::with_config(transport, SessionConfig::new());
//! session.establish(&[0u8; 32], 0x01)?;
//! let response = session.send_command(&[0x00, 0x84, 0x00, 0x00, 0x08])?;
//! println!("{}", hex::encode(&*response));
//! session.terminate();
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod commands;
pub mod config;
pub mod counter;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod session;

pub use config::SessionConfig;
pub use counter::Counter;
pub use error::{Error, ErrorKind, Phase, Result};
pub use keys::{ROOT_KEY_LENGTH, SessionKeys};
pub use session::{SecureSession, Status};

// Re-export the transport layer so callers need a single dependency
pub use readerlink_apdu_core::{ReaderTransport, TransportError, TransportMode};
