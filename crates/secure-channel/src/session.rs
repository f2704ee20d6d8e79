//! Secure session state machine
//!
//! A [`SecureSession`] owns one transport and walks it through the four-step
//! handshake:
//!
//! 1. [`begin`](SecureSession::begin) loads the root key and opens the transport
//! 2. [`request_challenge`](SecureSession::request_challenge) fetches the reader nonce
//! 3. [`mutual_authenticate`](SecureSession::mutual_authenticate) sends the host's
//!    SIV-sealed nonce and key share
//! 4. [`verify_authentication`](SecureSession::verify_authentication) checks the
//!    reader's answer and derives the session keys
//!
//! [`establish`](SecureSession::establish) runs all four. Once established,
//! [`send_command`](SecureSession::send_command) wraps each APDU with the
//! session keys and the replay counter.
//!
//! Any failure past the precondition checks tears the session down: the
//! transport is released and all key material is wiped.

use std::{fmt, mem};

use bytes::Bytes;
use rand::{RngCore, rng};
use readerlink_apdu_core::{Command, ReaderTransport, Response, TransportMode};
use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

use crate::commands::{self, AUTH_MESSAGE_LENGTH, AUTH_PLAINTEXT_LENGTH, MAX_SECURE_PAYLOAD};
use crate::config::SessionConfig;
use crate::counter::Counter;
use crate::crypto::{BLOCK_SIZE, Key, Nonce, constant_time_eq, kdf, siv};
use crate::error::{Error, Phase, Result};
use crate::keys::SessionKeys;

/// Externally visible state of the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Status {
    /// No channel; only the handshake may be started
    #[display("not established")]
    NotEstablished,
    /// Reader nonce received
    #[display("challenge sent")]
    ChallengeSent,
    /// Host authentication sent, reader response not yet verified
    #[display("mutual authentication pending")]
    MutualAuthPending,
    /// Session keys installed, protected commands allowed
    #[display("established")]
    Established,
}

/// Internal state, carrying exactly the material each step needs
enum State {
    /// Nothing held
    Idle,
    /// Root keys loaded and transport open
    Opened { level: u8, keys: SessionKeys },
    ChallengeSent {
        level: u8,
        keys: SessionKeys,
        reader_nonce: Zeroizing<Nonce>,
    },
    MutualAuthPending {
        level: u8,
        keys: SessionKeys,
        reader_nonce: Zeroizing<Nonce>,
        host_nonce: Zeroizing<Nonce>,
        host_key: Zeroizing<Key>,
        response: Bytes,
    },
    Established { level: u8, keys: SessionKeys, counter: Counter },
}

impl State {
    const fn status(&self) -> Status {
        match self {
            Self::Idle | Self::Opened { .. } => Status::NotEstablished,
            Self::ChallengeSent { .. } => Status::ChallengeSent,
            Self::MutualAuthPending { .. } => Status::MutualAuthPending,
            Self::Established { .. } => Status::Established,
        }
    }
}

/// Secure channel to a reader over a [`ReaderTransport`]
pub struct SecureSession<T: ReaderTransport> {
    /// The underlying transport
    transport: T,
    /// Session configuration
    config: SessionConfig,
    /// Handshake progress and key material
    state: State,
}

impl<T: ReaderTransport> fmt::Debug for SecureSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureSession")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .field("status", &self.status())
            .finish()
    }
}

impl<T: ReaderTransport> SecureSession<T> {
    /// Create a session with the default configuration
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    /// Create a session with the given configuration
    pub const fn with_config(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            state: State::Idle,
        }
    }

    /// Current state of the channel
    pub const fn status(&self) -> Status {
        self.state.status()
    }

    /// Whether protected commands can be sent
    pub const fn is_established(&self) -> bool {
        matches!(self.state, State::Established { .. })
    }

    /// Key access level of the current handshake attempt, if any
    pub const fn key_access_level(&self) -> Option<u8> {
        match &self.state {
            State::Idle => None,
            State::Opened { level, .. }
            | State::ChallengeSent { level, .. }
            | State::MutualAuthPending { level, .. }
            | State::Established { level, .. } => Some(*level),
        }
    }

    /// Current replay counter value, only present once established
    pub const fn counter(&self) -> Option<u128> {
        match &self.state {
            State::Established { counter, .. } => Some(counter.to_u128()),
            _ => None,
        }
    }

    /// Transport mode used for every exchange
    pub const fn transport_mode(&self) -> TransportMode {
        self.config.transport_mode
    }

    /// Get a reference to the transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the transport
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Run the complete handshake with a 32-byte root key
    ///
    /// The root key is the initial encryption key followed by the initial
    /// MAC key. On success the session is [`Status::Established`]; on any
    /// failure it is back in [`Status::NotEstablished`].
    pub fn establish(&mut self, root_key: &[u8], key_access_level: u8) -> Result<()> {
        debug!(level = key_access_level, "Establishing secure channel");
        self.begin(root_key, key_access_level)?;
        self.request_challenge()?;
        self.mutual_authenticate()?;
        self.verify_authentication()
    }

    /// Load the root key and open the transport
    ///
    /// The key length is checked before the transport is touched.
    pub fn begin(&mut self, root_key: &[u8], key_access_level: u8) -> Result<()> {
        self.expect_status(Status::NotEstablished)?;
        let keys = SessionKeys::from_slice(root_key)?;

        // A fresh attempt never inherits material from an earlier one
        self.state = State::Idle;

        if !self.transport.is_connected() {
            let mode = self.config.transport_mode;
            if let Err(e) = self.transport.connect(mode) {
                return Err(self.abort(Phase::Open, e.into()));
            }
            debug!(%mode, "Transport connected");
        }

        self.state = State::Opened {
            level: key_access_level,
            keys,
        };
        Ok(())
    }

    /// Send GET CHALLENGE and keep the reader nonce
    pub fn request_challenge(&mut self) -> Result<()> {
        let (level, keys) = match mem::replace(&mut self.state, State::Idle) {
            State::Opened { level, keys } => (level, keys),
            State::Idle => return Err(Error::NotOpened),
            other => return Err(self.restore(other, Status::NotEstablished)),
        };

        let result = self
            .transmit(&commands::get_challenge(level), Phase::Challenge)
            .and_then(|body| {
                let nonce: Nonce = body
                    .as_ref()
                    .try_into()
                    .map_err(|_| Error::malformed(Phase::Challenge, "challenge is not 16 bytes"))?;
                Ok(Zeroizing::new(nonce))
            });

        match result {
            Ok(reader_nonce) => {
                debug!("Challenge received");
                self.state = State::ChallengeSent {
                    level,
                    keys,
                    reader_nonce,
                };
                Ok(())
            }
            Err(e) => Err(self.abort(Phase::Challenge, e)),
        }
    }

    /// Send MUTUAL AUTHENTICATE with a fresh host nonce and key share
    pub fn mutual_authenticate(&mut self) -> Result<()> {
        let (level, keys, reader_nonce) = match mem::replace(&mut self.state, State::Idle) {
            State::ChallengeSent {
                level,
                keys,
                reader_nonce,
            } => (level, keys, reader_nonce),
            other => return Err(self.restore(other, Status::ChallengeSent)),
        };

        let mut host_nonce = Zeroizing::new([0u8; BLOCK_SIZE]);
        let mut host_key = Zeroizing::new([0u8; BLOCK_SIZE]);
        let mut rng = rng();
        rng.fill_bytes(&mut *host_nonce);
        rng.fill_bytes(&mut *host_key);

        let mut plaintext = Zeroizing::new(Vec::with_capacity(AUTH_PLAINTEXT_LENGTH));
        plaintext.extend_from_slice(&*host_nonce);
        plaintext.extend_from_slice(&*reader_nonce);
        plaintext.extend_from_slice(&*host_key);

        let (ciphertext, tag) = siv::protect(keys.enc(), keys.mac(), &[level], &plaintext);

        let result = commands::mutual_authenticate(&ciphertext, &tag)
            .map_err(Error::from)
            .and_then(|command| self.transmit(&command, Phase::MutualAuthentication));

        match result {
            Ok(response) => {
                debug!("Mutual authentication sent");
                self.state = State::MutualAuthPending {
                    level,
                    keys,
                    reader_nonce,
                    host_nonce,
                    host_key,
                    response,
                };
                Ok(())
            }
            Err(e) => Err(self.abort(Phase::MutualAuthentication, e)),
        }
    }

    /// Verify the reader's authentication response and install session keys
    ///
    /// The response must decrypt under the root keys, echo the reader nonce
    /// and the host nonce, and carry the reader's key share.
    pub fn verify_authentication(&mut self) -> Result<()> {
        let (level, keys, reader_nonce, host_nonce, host_key, response) =
            match mem::replace(&mut self.state, State::Idle) {
                State::MutualAuthPending {
                    level,
                    keys,
                    reader_nonce,
                    host_nonce,
                    host_key,
                    response,
                } => (level, keys, reader_nonce, host_nonce, host_key, response),
                other => return Err(self.restore(other, Status::MutualAuthPending)),
            };

        match verify_reader(level, &keys, &reader_nonce, &host_nonce, &host_key, &response) {
            Ok(session_keys) => {
                let counter = Counter::seed(&host_nonce, &reader_nonce);
                self.state = State::Established {
                    level,
                    keys: session_keys,
                    counter,
                };
                debug!(level, "Secure channel established");
                Ok(())
            }
            Err(e) => Err(self.abort(Phase::Verification, e)),
        }
    }

    /// Send one APDU through the established channel and return the reader's plaintext answer
    ///
    /// Fails without side effects if the session is not established or the
    /// APDU does not fit; any later failure terminates the session.
    pub fn send_command(&mut self, apdu: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.expect_status(Status::Established)?;
        if apdu.len() > MAX_SECURE_PAYLOAD {
            return Err(Error::PayloadTooLong {
                length: apdu.len(),
                max: MAX_SECURE_PAYLOAD,
            });
        }

        let Self {
            transport,
            config,
            state,
        } = self;
        let result = match state {
            State::Established { keys, counter, .. } => {
                exchange(transport, config.transport_mode, keys, counter, apdu)
            }
            _ => return Err(Error::NotOpened),
        };

        match result {
            Ok(plaintext) => Ok(plaintext),
            Err(e) => {
                if e.is_verification() {
                    warn!(error = %e, "Secure command response rejected");
                } else {
                    debug!(error = %e, "Secure command failed");
                }
                self.terminate();
                Err(e)
            }
        }
    }

    /// Close the channel
    ///
    /// Sends TERMINATE when established (best effort), releases the transport
    /// and wipes all key material. Safe to call in any state.
    pub fn terminate(&mut self) {
        if self.is_established() {
            let command = commands::terminate().to_bytes();
            if let Err(e) = self.transport.transmit_raw(&command, self.config.transport_mode) {
                debug!(error = %e, "Terminate command failed");
            }
        }
        self.transport.disconnect();
        self.state = State::Idle;
        debug!("Secure channel terminated");
    }

    fn expect_status(&self, expected: Status) -> Result<()> {
        let actual = self.status();
        if actual == expected {
            Ok(())
        } else {
            Err(Error::InvalidState { expected, actual })
        }
    }

    /// Put back state taken for a step that turned out to be invalid
    fn restore(&mut self, state: State, expected: Status) -> Error {
        let actual = state.status();
        self.state = state;
        Error::InvalidState { expected, actual }
    }

    /// Drop all handshake material and release the transport
    fn abort(&mut self, phase: Phase, error: Error) -> Error {
        if error.is_verification() {
            warn!(%phase, error = %error, "Handshake verification failed");
        } else {
            debug!(%phase, error = %error, "Handshake step failed");
        }
        self.state = State::Idle;
        self.transport.disconnect();
        error
    }

    fn transmit(&mut self, command: &Command, phase: Phase) -> Result<Bytes> {
        transmit(&mut self.transport, self.config.transport_mode, command, phase)
    }
}

impl<T: ReaderTransport> Drop for SecureSession<T> {
    fn drop(&mut self) {
        if self.config.terminate_on_drop && self.is_established() {
            self.terminate();
        }
    }
}

/// Send a command and return the body of a `90 00` response
fn transmit<T: ReaderTransport>(
    transport: &mut T,
    mode: TransportMode,
    command: &Command,
    phase: Phase,
) -> Result<Bytes> {
    trace!(?command, %phase, "Sending secure channel command");
    let raw = transport.transmit_raw(&command.to_bytes(), mode)?;
    Response::from_bytes(&raw)?
        .into_payload()
        .map_err(|e| Error::status(phase, e.status))
}

/// Check the reader's mutual authentication answer and derive the session keys
fn verify_reader(
    level: u8,
    keys: &SessionKeys,
    reader_nonce: &Nonce,
    host_nonce: &Nonce,
    host_key: &Key,
    response: &[u8],
) -> Result<SessionKeys> {
    if response.len() != AUTH_MESSAGE_LENGTH {
        return Err(Error::malformed(
            Phase::Verification,
            "authentication response is not 64 bytes",
        ));
    }
    let (ciphertext, tag) = commands::split_sealed(response)
        .ok_or_else(|| Error::malformed(Phase::Verification, "missing tag"))?;

    let plaintext = siv::unprotect(keys.enc(), keys.mac(), &[level], ciphertext, &tag)
        .map_err(|_| Error::authentication(Phase::Verification, "tag mismatch"))?;

    let echoed_reader = constant_time_eq(&plaintext[..BLOCK_SIZE], reader_nonce);
    let echoed_host = constant_time_eq(&plaintext[BLOCK_SIZE..2 * BLOCK_SIZE], host_nonce);
    if !(echoed_reader & echoed_host) {
        return Err(Error::authentication(Phase::Verification, "nonce mismatch"));
    }

    let mut ikm = Zeroizing::new([0u8; 2 * BLOCK_SIZE]);
    ikm[..BLOCK_SIZE].copy_from_slice(host_key);
    ikm[BLOCK_SIZE..].copy_from_slice(&plaintext[2 * BLOCK_SIZE..AUTH_PLAINTEXT_LENGTH]);

    let derived = kdf::derive(&*ikm, keys.mac());
    Ok(SessionKeys::from_derived(&derived))
}

/// One protected round trip; the counter advances once per direction
fn exchange<T: ReaderTransport>(
    transport: &mut T,
    mode: TransportMode,
    keys: &SessionKeys,
    counter: &mut Counter,
    apdu: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let header = *counter.increment();
    let (ciphertext, tag) = siv::protect(keys.enc(), keys.mac(), &header, apdu);
    let command = commands::secure_command(&ciphertext, &tag)?;

    let body = transmit(transport, mode, &command, Phase::SecureCommand);
    counter.increment();
    let body = body?;

    let (ciphertext, tag) = commands::split_sealed(&body)
        .ok_or_else(|| Error::malformed(Phase::SecureCommand, "response shorter than a tag"))?;

    siv::unprotect(keys.enc(), keys.mac(), counter.as_bytes(), ciphertext, &tag)
        .map_err(|_| Error::authentication(Phase::SecureCommand, "tag mismatch"))
}
