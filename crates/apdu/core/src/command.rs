//! APDU command definitions
//!
//! Only short APDUs are supported: the data field is limited to 255 bytes and
//! the expected length to a single byte.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

/// Maximum data field length of a short APDU
pub const MAX_DATA_LENGTH: usize = 255;

/// Error raised while building an APDU command
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Data too long for a short APDU
    #[error("Data too long: {0} bytes (max 255)")]
    DataTooLong(usize),
}

/// Generic APDU command structure
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    cla: u8,
    /// Instruction byte
    ins: u8,
    /// Parameter 1
    p1: u8,
    /// Parameter 2
    p2: u8,
    /// Command data (optional)
    data: Option<Bytes>,
    /// Expected length (optional)
    le: Option<u8>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a new command with expected response length (Le)
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: Some(le),
        }
    }

    /// Attach a data field, rejecting anything longer than a short APDU allows
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Result<Self, CommandError> {
        let data = data.into();
        if data.len() > MAX_DATA_LENGTH {
            return Err(CommandError::DataTooLong(data.len()));
        }
        self.data = Some(data);
        Ok(self)
    }

    /// Calculate length of serialized command
    pub fn command_length(&self) -> usize {
        // Header (CLA, INS, P1, P2) is always 4 bytes
        4 + self.data.as_ref().map_or(0, |d| 1 + d.len()) + usize::from(self.le.is_some())
    }

    /// Convert to raw APDU bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.command_length());

        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        if let Some(data) = &self.data {
            // Length was bounded by `with_data`
            buffer.put_u8(data.len() as u8);
            buffer.put_slice(data);
        }

        if let Some(le) = self.le {
            buffer.put_u8(le);
        }

        buffer.freeze()
    }
}

// Data may be ciphertext, keep it out of debug output
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("cla", &format_args!("{:#04x}", self.cla))
            .field("ins", &format_args!("{:#04x}", self.ins))
            .field("p1", &format_args!("{:#04x}", self.p1))
            .field("p2", &format_args!("{:#04x}", self.p2))
            .field("data_len", &self.data.as_ref().map(Bytes::len))
            .field("le", &self.le)
            .finish()
    }
}
