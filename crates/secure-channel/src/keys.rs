//! Session key material

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::Error;
use crate::crypto::kdf::DERIVED_LENGTH;
use crate::crypto::{BLOCK_SIZE, Key};

/// Length of a root key: encryption key followed by MAC key
pub const ROOT_KEY_LENGTH: usize = 2 * BLOCK_SIZE;

/// Encryption and MAC keys of the channel
///
/// Before the handshake completes these are the root keys; afterwards they
/// are replaced by the derived session keys.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    /// Encryption key
    enc: Key,
    /// MAC key
    mac: Key,
}

impl SessionKeys {
    /// Create a key set from its two halves
    pub const fn new(enc: Key, mac: Key) -> Self {
        Self { enc, mac }
    }

    /// Split a 32-byte root key into encryption and MAC keys
    pub fn from_slice(key: &[u8]) -> Result<Self, Error> {
        if key.len() != ROOT_KEY_LENGTH {
            return Err(Error::InvalidKeyLength(key.len()));
        }
        let mut enc = [0u8; BLOCK_SIZE];
        let mut mac = [0u8; BLOCK_SIZE];
        enc.copy_from_slice(&key[..BLOCK_SIZE]);
        mac.copy_from_slice(&key[BLOCK_SIZE..]);
        let keys = Self::new(enc, mac);
        enc.zeroize();
        mac.zeroize();
        Ok(keys)
    }

    /// Build the key set from KDF output: first half encrypts, second half MACs
    pub(crate) fn from_derived(derived: &[u8; DERIVED_LENGTH]) -> Self {
        let mut keys = Self::new([0u8; BLOCK_SIZE], [0u8; BLOCK_SIZE]);
        keys.enc.copy_from_slice(&derived[..BLOCK_SIZE]);
        keys.mac.copy_from_slice(&derived[BLOCK_SIZE..]);
        keys
    }

    /// Get the encryption key
    pub const fn enc(&self) -> &Key {
        &self.enc
    }

    /// Get the MAC key
    pub const fn mac(&self) -> &Key {
        &self.mac
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys")
            .field("enc", &"<redacted>")
            .field("mac", &"<redacted>")
            .finish()
    }
}
