//! Cryptographic building blocks of the secure channel
//!
//! Everything is AES-128 based: a CMAC primitive ([`mac`]), the SIV
//! construction built on it ([`siv`]) and the two-block counter-mode KDF
//! ([`kdf`]). Keys, nonces and tags are all one 16-byte block.

pub mod kdf;
pub mod mac;
pub mod siv;

use subtle::ConstantTimeEq;

/// Block size of the underlying cipher
pub const BLOCK_SIZE: usize = 16;

/// One cipher block
pub type Block = [u8; BLOCK_SIZE];
/// A 128-bit key
pub type Key = [u8; BLOCK_SIZE];
/// A 128-bit nonce
pub type Nonce = [u8; BLOCK_SIZE];
/// A 128-bit SIV / CMAC tag
pub type Tag = [u8; BLOCK_SIZE];

/// Compare two byte strings without early exit on the first difference
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

pub(crate) fn xor_in_place(block: &mut Block, other: &Block) {
    for (a, b) in block.iter_mut().zip(other) {
        *a ^= b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(&[1, 2, 3], &[1, 2, 3]));
        assert!(!constant_time_eq(&[1, 2, 3], &[1, 2, 4]));
        // Length mismatch is never equal
        assert!(!constant_time_eq(&[1, 2, 3], &[1, 2]));
    }

    #[test]
    fn test_xor_in_place() {
        let mut block = [0xF0; BLOCK_SIZE];
        xor_in_place(&mut block, &[0xFF; BLOCK_SIZE]);
        assert_eq!(block, [0x0F; BLOCK_SIZE]);
    }
}
