//! AES-128 CMAC (RFC 4493)
//!
//! Thin wrapper around the `cmac` crate so the rest of the channel works on
//! fixed-size blocks.

use aes::Aes128;
use cipher::generic_array::GenericArray;
use cmac::{Cmac, Mac};

use super::{Key, Tag};

/// Calculate the CMAC of `message` under `key`
pub fn cmac(key: &Key, message: &[u8]) -> Tag {
    cmac_parts(key, &[message])
}

/// Calculate the CMAC over the concatenation of `parts` without building it
pub fn cmac_parts(key: &Key, parts: &[&[u8]]) -> Tag {
    let mut mac = <Cmac<Aes128> as Mac>::new(GenericArray::from_slice(key));
    for part in parts {
        mac.update(part);
    }
    mac.finalize().into_bytes().into()
}
