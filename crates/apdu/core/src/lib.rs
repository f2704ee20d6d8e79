//! Core types for APDU (Application Protocol Data Unit) exchanges with card readers
//!
//! This crate provides the foundational pieces shared by the readerlink crates:
//!
//! - Building short APDU commands
//! - Parsing responses and interpreting the trailing status word
//! - The [`ReaderTransport`] trait that moves raw bytes to and from a reader,
//!   either through a card session or through the reader's direct control channel
//!
//! It knows nothing about secure channels; those are layered on top of a transport.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod command;
pub mod response;
pub mod transport;

pub use command::{Command, CommandError};
pub use response::error::{ResponseError, StatusError};
pub use response::status::StatusWord;
pub use response::Response;
pub use response::status::common as status;
pub use transport::{ReaderTransport, TransportError, TransportMode};
