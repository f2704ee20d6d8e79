//! Secure channel command frames
//!
//! All four commands share the reader-class pseudo-APDU `FF 72`; P1 selects
//! the step.

use readerlink_apdu_core::{Command, CommandError};

use crate::crypto::{BLOCK_SIZE, Tag};

/// Reader pseudo-APDU class
pub const CLA_READER: u8 = 0xFF;
/// Secure channel instruction
pub const INS_SECURE_CHANNEL: u8 = 0x72;

/// P1 of GET CHALLENGE
pub const P1_GET_CHALLENGE: u8 = 0x00;
/// P1 of MUTUAL AUTHENTICATE
pub const P1_MUTUAL_AUTHENTICATE: u8 = 0x01;
/// P1 of SECURE COMMAND
pub const P1_SECURE_COMMAND: u8 = 0x02;
/// P1 of TERMINATE
pub const P1_TERMINATE: u8 = 0x03;

/// Plaintext of the mutual authentication exchange: three 16-byte values
pub const AUTH_PLAINTEXT_LENGTH: usize = 3 * BLOCK_SIZE;
/// Data field of MUTUAL AUTHENTICATE and of its response
pub const AUTH_MESSAGE_LENGTH: usize = AUTH_PLAINTEXT_LENGTH + BLOCK_SIZE;

/// Largest payload a SECURE COMMAND can carry once the tag is appended
pub const MAX_SECURE_PAYLOAD: usize = readerlink_apdu_core::command::MAX_DATA_LENGTH - BLOCK_SIZE;

/// `FF 72 00 <level> 00`: ask the reader for its nonce
pub const fn get_challenge(key_access_level: u8) -> Command {
    Command::new_with_le(CLA_READER, INS_SECURE_CHANNEL, P1_GET_CHALLENGE, key_access_level, 0x00)
}

/// `FF 72 01 00 40 <ciphertext><tag>`
pub fn mutual_authenticate(ciphertext: &[u8], tag: &Tag) -> Result<Command, CommandError> {
    Command::new(CLA_READER, INS_SECURE_CHANNEL, P1_MUTUAL_AUTHENTICATE, 0x00)
        .with_data(sealed(ciphertext, tag))
}

/// `FF 72 02 00 <len> <ciphertext><tag>`
pub fn secure_command(ciphertext: &[u8], tag: &Tag) -> Result<Command, CommandError> {
    Command::new(CLA_READER, INS_SECURE_CHANNEL, P1_SECURE_COMMAND, 0x00)
        .with_data(sealed(ciphertext, tag))
}

/// `FF 72 03 00 00`: close the channel on the reader side
pub const fn terminate() -> Command {
    Command::new_with_le(CLA_READER, INS_SECURE_CHANNEL, P1_TERMINATE, 0x00, 0x00)
}

fn sealed(ciphertext: &[u8], tag: &Tag) -> Vec<u8> {
    let mut data = Vec::with_capacity(ciphertext.len() + tag.len());
    data.extend_from_slice(ciphertext);
    data.extend_from_slice(tag);
    data
}

/// Split a sealed message into ciphertext and trailing tag
pub fn split_sealed(data: &[u8]) -> Option<(&[u8], Tag)> {
    let split = data.len().checked_sub(BLOCK_SIZE)?;
    let (ciphertext, tag) = data.split_at(split);
    Some((ciphertext, tag.try_into().ok()?))
}
