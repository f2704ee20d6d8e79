//! Two-block counter-mode KDF over CMAC

use zeroize::Zeroizing;

use super::mac::cmac_parts;
use super::{BLOCK_SIZE, Key};

/// Length of the derived key material
pub const DERIVED_LENGTH: usize = 2 * BLOCK_SIZE;

/// Per-block suffix: block counter, then a fixed label and separator
const FIRST_BLOCK: [u8; 3] = [0x01, 0x01, 0x00];
const SECOND_BLOCK: [u8; 3] = [0x02, 0x01, 0x00];

/// Derive 32 bytes of key material from `ikm` under `mac_key`
///
/// Output is `CMAC(mac_key, ikm || 01 01 00) || CMAC(mac_key, ikm || 02 01 00)`.
pub fn derive(ikm: &[u8], mac_key: &Key) -> Zeroizing<[u8; DERIVED_LENGTH]> {
    let mut out = Zeroizing::new([0u8; DERIVED_LENGTH]);
    out[..BLOCK_SIZE].copy_from_slice(&cmac_parts(mac_key, &[ikm, &FIRST_BLOCK]));
    out[BLOCK_SIZE..].copy_from_slice(&cmac_parts(mac_key, &[ikm, &SECOND_BLOCK]));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::mac::cmac;
    use hex_literal::hex;

    const MAC_KEY: Key = hex!("2b7e151628aed2a6abf7158809cf4f3c");

    #[test]
    fn test_derive_matches_block_definition() {
        let ikm = hex!(
            "000102030405060708090a0b0c0d0e0f"
            "101112131415161718191a1b1c1d1e1f"
        );
        let out = derive(&ikm, &MAC_KEY);

        let mut first = ikm.to_vec();
        first.extend_from_slice(&[0x01, 0x01, 0x00]);
        let mut second = ikm.to_vec();
        second.extend_from_slice(&[0x02, 0x01, 0x00]);

        assert_eq!(out[..16], cmac(&MAC_KEY, &first));
        assert_eq!(out[16..], cmac(&MAC_KEY, &second));
        assert_ne!(out[..16], out[16..]);
    }

    #[test]
    fn test_derive_depends_on_inputs() {
        let ikm = [0x11u8; 32];
        let base = derive(&ikm, &MAC_KEY);
        assert_eq!(*base, *derive(&ikm, &MAC_KEY));

        let mut other = ikm;
        other[31] ^= 1;
        assert_ne!(*base, *derive(&other, &MAC_KEY));

        let mut key = MAC_KEY;
        key[0] ^= 1;
        assert_ne!(*base, *derive(&ikm, &key));
    }
}
