//! Session handshake.
//!
//! The host opens with an 8-byte preamble and the receiver answers with 8
//! bytes of its own:
//! ```text
//! ['S' 'B' 'T' 'V'][0x00 0x00][major:1][minor:1]
//! ```
//! The session proceeds only if the answer starts with the same magic.

use std::io::{self, Read, Write};

use thiserror::Error;

use crate::protocol::constants::{MAGIC, MAJOR_VERSION, MINOR_VERSION};

/// Length of both the preamble and the answer.
pub const PREAMBLE_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("handshake I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The receiver answered with something other than the protocol magic.
    #[error("handshake answer has bad magic: {0:02X?}")]
    BadMagic([u8; PREAMBLE_LEN]),
}

/// Returns the preamble this host sends.
pub fn preamble() -> [u8; PREAMBLE_LEN] {
    let mut bytes = [0u8; PREAMBLE_LEN];
    bytes[..4].copy_from_slice(MAGIC);
    bytes[6] = MAJOR_VERSION;
    bytes[7] = MINOR_VERSION;
    bytes
}

/// Writes and flushes the preamble.
pub fn write_preamble<W: Write + ?Sized>(writer: &mut W) -> io::Result<()> {
    writer.write_all(&preamble())?;
    writer.flush()
}

/// The receiver's 8-byte answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeAnswer {
    raw: [u8; PREAMBLE_LEN],
}

impl HandshakeAnswer {
    pub fn from_bytes(raw: [u8; PREAMBLE_LEN]) -> Self {
        Self { raw }
    }

    pub fn is_valid(&self) -> bool {
        self.raw.starts_with(MAGIC)
    }

    /// Version advertised by the receiver as `(major, minor)`.
    pub fn peer_version(&self) -> (u8, u8) {
        (self.raw[6], self.raw[7])
    }

    pub fn as_bytes(&self) -> &[u8; PREAMBLE_LEN] {
        &self.raw
    }
}

/// Reads the receiver's answer and checks its magic.
///
/// # Errors
///
/// Returns [`HandshakeError::Io`] if fewer than 8 bytes arrive, or
/// [`HandshakeError::BadMagic`] if the answer is not an HME answer.
pub fn read_answer<R: Read + ?Sized>(reader: &mut R) -> Result<HandshakeAnswer, HandshakeError> {
    let mut raw = [0u8; PREAMBLE_LEN];
    reader.read_exact(&mut raw)?;
    let answer = HandshakeAnswer::from_bytes(raw);
    if answer.is_valid() {
        Ok(answer)
    } else {
        Err(HandshakeError::BadMagic(raw))
    }
}
