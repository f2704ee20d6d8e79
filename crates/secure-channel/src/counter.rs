//! Replay counter shared by host and reader
//!
//! The counter is a 128-bit big-endian integer. Both sides increment it
//! before every protected message, so each secure command consumes two
//! values. It wraps to zero after `2^128 - 1`.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{BLOCK_SIZE, Nonce};

/// Bytes taken from the front of each nonce to seed the counter
const SEED_HALF: usize = BLOCK_SIZE / 2;

/// 128-bit big-endian replay counter
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Counter([u8; BLOCK_SIZE]);

impl Counter {
    /// Seed from the handshake nonces: `host_nonce[..8] || reader_nonce[..8]`
    pub fn seed(host_nonce: &Nonce, reader_nonce: &Nonce) -> Self {
        let mut value = [0u8; BLOCK_SIZE];
        value[..SEED_HALF].copy_from_slice(&host_nonce[..SEED_HALF]);
        value[SEED_HALF..].copy_from_slice(&reader_nonce[..SEED_HALF]);
        Self(value)
    }

    /// Start from an explicit value
    pub const fn from_bytes(value: [u8; BLOCK_SIZE]) -> Self {
        Self(value)
    }

    /// Advance by one and return the new value
    pub fn increment(&mut self) -> &[u8; BLOCK_SIZE] {
        self.0 = self.to_u128().wrapping_add(1).to_be_bytes();
        &self.0
    }

    /// Current value as the header of a protected message
    pub const fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }

    /// Current value as an integer
    pub const fn to_u128(&self) -> u128 {
        u128::from_be_bytes(self.0)
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Counter({})", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_seed_takes_nonce_prefixes() {
        let host = hex!("00112233445566778899aabbccddeeff");
        let reader = hex!("ffeeddccbbaa99887766554433221100");
        let counter = Counter::seed(&host, &reader);
        assert_eq!(
            counter.as_bytes(),
            &hex!("0011223344556677ffeeddccbbaa9988")
        );
    }

    #[test]
    fn test_increment_carries() {
        let mut counter = Counter::from_bytes(hex!("000000000000000000000000000000ff"));
        assert_eq!(
            counter.increment(),
            &hex!("00000000000000000000000000000100")
        );

        let mut counter = Counter::from_bytes(hex!("00ffffffffffffffffffffffffffffff"));
        counter.increment();
        assert_eq!(counter.to_u128(), 1u128 << 120);
    }

    #[test]
    fn test_increment_wraps() {
        let mut counter = Counter::from_bytes([0xFF; 16]);
        assert_eq!(counter.increment(), &[0u8; 16]);
    }

    #[test]
    fn test_zeroize() {
        let mut counter = Counter::from_bytes([0x5A; 16]);
        counter.zeroize();
        assert_eq!(counter.as_bytes(), &[0u8; 16]);
    }
}
