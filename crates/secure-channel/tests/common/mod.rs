//! Simulated reader implementing the device side of the secure channel

#![allow(dead_code, unreachable_pub)]

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use readerlink_apdu_core::status::{
    CONDITIONS_NOT_SATISFIED, INCORRECT_P1P2, INS_NOT_SUPPORTED, SECURITY_NOT_SATISFIED,
    WRONG_DATA,
};
use readerlink_apdu_core::{ReaderTransport, Response, TransportError, TransportMode};
use readerlink_secure_channel::commands::{
    CLA_READER, INS_SECURE_CHANNEL, P1_GET_CHALLENGE, P1_MUTUAL_AUTHENTICATE, P1_SECURE_COMMAND,
    P1_TERMINATE, split_sealed,
};
use readerlink_secure_channel::crypto::{Nonce, constant_time_eq, kdf, siv};
use readerlink_secure_channel::{Counter, SessionKeys};

pub const ROOT_KEY: [u8; 32] = [
    0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4a, 0x4b, 0x4c, 0x4d, 0x4e, 0x4f,
    0x50, 0x51, 0x52, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5a, 0x5b, 0x5c, 0x5d, 0x5e, 0x5f,
];

pub const KEY_ACCESS_LEVEL: u8 = 0x01;

/// Answer returned for every unwrapped APDU: the APDU itself followed by `90 00`
pub fn echo_answer(apdu: &[u8]) -> Vec<u8> {
    let mut answer = apdu.to_vec();
    answer.extend_from_slice(&[0x90, 0x00]);
    answer
}

#[derive(Debug)]
struct Channel {
    keys: SessionKeys,
    counter: Counter,
}

/// A compliant reader with optional fault injection
#[derive(Debug)]
pub struct SimulatedReader {
    root: SessionKeys,
    level: u8,
    rng: StdRng,
    connection: Option<TransportMode>,
    reader_nonce: Option<Nonce>,
    channel: Option<Channel>,

    /// Flip this bit of the next mutual authentication response body
    pub corrupt_auth_bit: Option<usize>,
    /// Flip this byte of the next secure command response body
    pub corrupt_response_byte: Option<usize>,
    /// Process the next command, then fail its reply with this error
    pub lose_next_response: Option<TransportError>,
    /// Raw commands received, in order
    pub received: Vec<Bytes>,
    /// Secure command APDUs received after unwrapping
    pub unwrapped: Vec<Vec<u8>>,
    /// Number of TERMINATE commands received
    pub terminates: usize,
    /// Number of `connect` calls
    pub connects: usize,
}

impl SimulatedReader {
    pub fn new(root_key: &[u8], level: u8, seed: u64) -> Self {
        Self {
            root: SessionKeys::from_slice(root_key).expect("32-byte root key"),
            level,
            rng: StdRng::seed_from_u64(seed),
            connection: None,
            reader_nonce: None,
            channel: None,
            corrupt_auth_bit: None,
            corrupt_response_byte: None,
            lose_next_response: None,
            received: Vec::new(),
            unwrapped: Vec::new(),
            terminates: 0,
            connects: 0,
        }
    }

    pub fn compliant() -> Self {
        Self::new(&ROOT_KEY, KEY_ACCESS_LEVEL, 0x5EED)
    }

    /// Reader-side counter, if a channel is open
    pub fn counter(&self) -> Option<u128> {
        self.channel.as_ref().map(|c| c.counter.to_u128())
    }

    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    fn get_challenge(&mut self, level: u8) -> Response {
        if level != self.level {
            return Response::error(INCORRECT_P1P2);
        }
        let mut nonce = [0u8; 16];
        self.rng.fill_bytes(&mut nonce);
        self.reader_nonce = Some(nonce);
        self.channel = None;
        Response::success(Bytes::copy_from_slice(&nonce))
    }

    fn mutual_authenticate(&mut self, data: &[u8]) -> Response {
        let Some(reader_nonce) = self.reader_nonce.take() else {
            return Response::error(CONDITIONS_NOT_SATISFIED);
        };
        if data.len() != 64 {
            return Response::error(WRONG_DATA);
        }
        let Some((ciphertext, tag)) = split_sealed(data) else {
            return Response::error(WRONG_DATA);
        };
        let header = [self.level];
        let Ok(plaintext) = siv::unprotect(self.root.enc(), self.root.mac(), &header, ciphertext, &tag)
        else {
            return Response::error(SECURITY_NOT_SATISFIED);
        };
        if !constant_time_eq(&plaintext[16..32], &reader_nonce) {
            return Response::error(SECURITY_NOT_SATISFIED);
        }

        let host_nonce: Nonce = plaintext[..16].try_into().expect("16 bytes");
        let mut reader_key = [0u8; 16];
        self.rng.fill_bytes(&mut reader_key);

        let mut answer = Vec::with_capacity(48);
        answer.extend_from_slice(&reader_nonce);
        answer.extend_from_slice(&host_nonce);
        answer.extend_from_slice(&reader_key);
        let (ciphertext, tag) = siv::protect(self.root.enc(), self.root.mac(), &header, &answer);

        let mut ikm = plaintext[32..48].to_vec();
        ikm.extend_from_slice(&reader_key);
        let derived = kdf::derive(&ikm, self.root.mac());
        self.channel = Some(Channel {
            keys: SessionKeys::new(
                derived[..16].try_into().expect("16 bytes"),
                derived[16..].try_into().expect("16 bytes"),
            ),
            counter: Counter::seed(&host_nonce, &reader_nonce),
        });

        let mut body = ciphertext;
        body.extend_from_slice(&tag);
        if let Some(bit) = self.corrupt_auth_bit.take() {
            body[bit / 8] ^= 1 << (bit % 8);
        }
        Response::success(Bytes::from(body))
    }

    fn secure_command(&mut self, data: &[u8]) -> Response {
        let Some(channel) = self.channel.as_mut() else {
            return Response::error(CONDITIONS_NOT_SATISFIED);
        };
        let Some((ciphertext, tag)) = split_sealed(data) else {
            return Response::error(WRONG_DATA);
        };

        let header = *channel.counter.increment();
        let Ok(apdu) = siv::unprotect(channel.keys.enc(), channel.keys.mac(), &header, ciphertext, &tag)
        else {
            self.channel = None;
            return Response::error(SECURITY_NOT_SATISFIED);
        };
        self.unwrapped.push(apdu.to_vec());

        let header = *channel.counter.increment();
        let (ciphertext, tag) =
            siv::protect(channel.keys.enc(), channel.keys.mac(), &header, &echo_answer(&apdu));

        let mut body = ciphertext;
        body.extend_from_slice(&tag);
        if let Some(index) = self.corrupt_response_byte.take() {
            body[index] ^= 0x01;
        }
        Response::success(Bytes::from(body))
    }
}

impl ReaderTransport for SimulatedReader {
    fn connect(&mut self, mode: TransportMode) -> Result<(), TransportError> {
        self.connection = Some(mode);
        self.connects += 1;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connection = None;
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn do_transmit_raw(
        &mut self,
        command: &[u8],
        mode: TransportMode,
    ) -> Result<Bytes, TransportError> {
        if self.connection != Some(mode) {
            return Err(TransportError::NotConnected);
        }
        self.received.push(Bytes::copy_from_slice(command));

        let response = match command {
            [CLA_READER, INS_SECURE_CHANNEL, P1_GET_CHALLENGE, level, 0x00] => {
                self.get_challenge(*level)
            }
            [CLA_READER, INS_SECURE_CHANNEL, P1_TERMINATE, 0x00, 0x00] => {
                self.terminates += 1;
                self.channel = None;
                Response::success(Bytes::new())
            }
            [CLA_READER, INS_SECURE_CHANNEL, p1, 0x00, lc, data @ ..]
                if usize::from(*lc) == data.len() =>
            {
                match *p1 {
                    P1_MUTUAL_AUTHENTICATE => self.mutual_authenticate(data),
                    P1_SECURE_COMMAND => self.secure_command(data),
                    _ => Response::error(INCORRECT_P1P2),
                }
            }
            _ => Response::error(INS_NOT_SUPPORTED),
        };

        match self.lose_next_response.take() {
            Some(error) => Err(error),
            None => Ok(response.to_bytes()),
        }
    }
}

/// Lets a test keep the reader after the session that borrowed it is gone
impl ReaderTransport for &mut SimulatedReader {
    fn connect(&mut self, mode: TransportMode) -> Result<(), TransportError> {
        (**self).connect(mode)
    }

    fn disconnect(&mut self) {
        (**self).disconnect();
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn do_transmit_raw(
        &mut self,
        command: &[u8],
        mode: TransportMode,
    ) -> Result<Bytes, TransportError> {
        (**self).do_transmit_raw(command, mode)
    }
}
