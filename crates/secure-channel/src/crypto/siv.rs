//! SIV authenticated encryption (RFC 5297) with a single header
//!
//! `S2V` folds the header and the payload into a synthetic IV with CMAC; the
//! same value is the authentication tag. The payload is then encrypted with
//! AES-128 in counter mode, starting from the tag with two bits masked. The
//! ciphertext has the same length as the plaintext.

use aes::Aes128;
use cipher::{KeyIvInit, StreamCipher, generic_array::GenericArray};
use zeroize::Zeroizing;

use super::mac::cmac;
use super::{BLOCK_SIZE, Block, Key, Tag, constant_time_eq, xor_in_place};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

const ZERO_BLOCK: Block = [0u8; BLOCK_SIZE];

/// Reduction constant of GF(2^128) for the doubling operation
const DOUBLE_RB: u8 = 0x87;

/// The recomputed tag did not match the received one
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("SIV tag mismatch")]
pub struct TagMismatch;

/// Multiply a block by `x` in GF(2^128)
pub fn double(block: &Block) -> Block {
    let carry = block[0] >> 7;
    let mut out = [0u8; BLOCK_SIZE];
    for i in 0..BLOCK_SIZE - 1 {
        out[i] = (block[i] << 1) | (block[i + 1] >> 7);
    }
    out[BLOCK_SIZE - 1] = block[BLOCK_SIZE - 1] << 1;
    // Branch-free reduction
    out[BLOCK_SIZE - 1] ^= DOUBLE_RB & carry.wrapping_neg();
    out
}

/// XOR `block` into the last 16 bytes of `data`, leaving the prefix untouched
///
/// `data` must be at least one block long.
pub fn xor_end(data: &[u8], block: &Block) -> Zeroizing<Vec<u8>> {
    debug_assert!(data.len() >= BLOCK_SIZE);
    let mut out = Zeroizing::new(data.to_vec());
    let start = out.len() - BLOCK_SIZE;
    for (a, b) in out[start..].iter_mut().zip(block) {
        *a ^= b;
    }
    out
}

/// ISO/IEC 9797-1 method 2 padding of a short final block
fn pad(data: &[u8]) -> Block {
    debug_assert!(data.len() < BLOCK_SIZE);
    let mut block = ZERO_BLOCK;
    block[..data.len()].copy_from_slice(data);
    block[data.len()] = 0x80;
    block
}

/// Compute the synthetic IV over `header` and `payload`
pub fn s2v(mac_key: &Key, header: &[u8], payload: &[u8]) -> Tag {
    let mut d = double(&cmac(mac_key, &ZERO_BLOCK));
    xor_in_place(&mut d, &cmac(mac_key, header));

    if payload.len() >= BLOCK_SIZE {
        cmac(mac_key, &xor_end(payload, &d))
    } else {
        let mut t = double(&d);
        xor_in_place(&mut t, &pad(payload));
        cmac(mac_key, &t)
    }
}

/// Derive the counter-mode IV from a tag by clearing bit 63 and bit 31
pub const fn siv_iv(tag: &Tag) -> Block {
    let mut iv = *tag;
    iv[8] &= 0x7f;
    iv[12] &= 0x7f;
    iv
}

/// Apply the SIV counter-mode keystream to `data` in place
///
/// Encryption and decryption are the same operation.
pub fn apply_keystream(enc_key: &Key, tag: &Tag, data: &mut [u8]) {
    let iv = siv_iv(tag);
    let mut cipher = Aes128Ctr::new(GenericArray::from_slice(enc_key), GenericArray::from_slice(&iv));
    cipher.apply_keystream(data);
}

/// Encrypt `plaintext` under the IV derived from `tag`
pub fn siv_encrypt(enc_key: &Key, tag: &Tag, plaintext: &[u8]) -> Vec<u8> {
    let mut data = plaintext.to_vec();
    apply_keystream(enc_key, tag, &mut data);
    data
}

/// Decrypt `ciphertext` under the IV derived from `tag`, without checking the tag
pub fn siv_decrypt(enc_key: &Key, tag: &Tag, ciphertext: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut data = Zeroizing::new(ciphertext.to_vec());
    apply_keystream(enc_key, tag, &mut data);
    data
}

/// Authenticate `header` and `payload`, encrypt `payload`
pub fn protect(enc_key: &Key, mac_key: &Key, header: &[u8], payload: &[u8]) -> (Vec<u8>, Tag) {
    let tag = s2v(mac_key, header, payload);
    let ciphertext = siv_encrypt(enc_key, &tag, payload);
    (ciphertext, tag)
}

/// Decrypt `ciphertext` and verify `tag` over `header` and the recovered plaintext
///
/// The plaintext is only released when the tags match; the comparison runs
/// in constant time.
pub fn unprotect(
    enc_key: &Key,
    mac_key: &Key,
    header: &[u8],
    ciphertext: &[u8],
    tag: &Tag,
) -> Result<Zeroizing<Vec<u8>>, TagMismatch> {
    let plaintext = siv_decrypt(enc_key, tag, ciphertext);
    let expected = s2v(mac_key, header, &plaintext);
    if constant_time_eq(&expected, tag) {
        Ok(plaintext)
    } else {
        Err(TagMismatch)
    }
}
