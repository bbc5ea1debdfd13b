//! Wire codec for the authentication protocol.
//!
//! One challenge in, one response out, then the connection closes. There is
//! no framing beyond the fixed sizes and no version field; multi-byte
//! integers are little-endian.
//!
//! Challenge (36 bytes):
//!
//! | offset | size | field  |
//! |-------:|-----:|--------|
//! | 0      | 6    | magic `"wherez"` |
//! | 6      | 10   | dialer's dedupe ID |
//! | 16     | 20   | fresh random nonce |
//!
//! Response (34 bytes):
//!
//! | offset | size | field  |
//! |-------:|-----:|--------|
//! | 0      | 2    | app port, little-endian |
//! | 2      | 32   | HMAC-SHA256(passphrase, nonce) |

use thiserror::Error;

use wherez_crypto::{random, CryptoError, DEDUPE_ID_SIZE, MAC_SIZE, NONCE_SIZE};

use crate::{CHALLENGE_SIZE, MAGIC, RESPONSE_SIZE};

/// Malformed protocol messages
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// Fewer bytes than the fixed message size
    #[error("message too short: expected {expected} bytes, got {actual}")]
    TooShort {
        /// Required size
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// The first six bytes were not `"wherez"`. Several DHT nodes will
    /// connect to whatever peer they believe exists, most likely to scrape
    /// torrent content; those are not wherez peers.
    #[error("bad magic header")]
    BadMagic,
}

/// The dialer's opening message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// The dialer's process dedupe ID, so an acceptor can recognize a
    /// connection to itself
    pub dedupe: [u8; DEDUPE_ID_SIZE],
    /// Fresh random nonce the acceptor must MAC
    pub nonce: [u8; NONCE_SIZE],
}

impl Challenge {
    /// Build a challenge with a freshly generated nonce.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::RandomFailed`] if the OS CSPRNG fails.
    pub fn generate(dedupe: [u8; DEDUPE_ID_SIZE]) -> Result<Self, CryptoError> {
        Ok(Self {
            dedupe,
            nonce: random::random_nonce()?,
        })
    }

    /// Encode to the fixed 36-byte wire form.
    #[must_use]
    pub fn encode(&self) -> [u8; CHALLENGE_SIZE] {
        let mut buf = [0u8; CHALLENGE_SIZE];
        buf[..6].copy_from_slice(&MAGIC);
        buf[6..16].copy_from_slice(&self.dedupe);
        buf[16..].copy_from_slice(&self.nonce);
        buf
    }

    /// Decode from wire bytes, validating the magic header.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TooShort`] for truncated input and
    /// [`WireError::BadMagic`] when the header is not `"wherez"`.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < CHALLENGE_SIZE {
            return Err(WireError::TooShort {
                expected: CHALLENGE_SIZE,
                actual: buf.len(),
            });
        }
        if buf[..6] != MAGIC {
            return Err(WireError::BadMagic);
        }

        let mut dedupe = [0u8; DEDUPE_ID_SIZE];
        dedupe.copy_from_slice(&buf[6..16]);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&buf[16..CHALLENGE_SIZE]);

        Ok(Self { dedupe, nonce })
    }
}

/// The acceptor's reply: proof it knows the passphrase, plus the port its
/// application listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The acceptor's advertised application port
    pub app_port: u16,
    /// MAC over the challenge nonce
    pub mac: [u8; MAC_SIZE],
}

impl Response {
    /// Encode to the fixed 34-byte wire form.
    #[must_use]
    pub fn encode(&self) -> [u8; RESPONSE_SIZE] {
        let mut buf = [0u8; RESPONSE_SIZE];
        buf[..2].copy_from_slice(&self.app_port.to_le_bytes());
        buf[2..].copy_from_slice(&self.mac);
        buf
    }

    /// Decode from wire bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TooShort`] for truncated input.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < RESPONSE_SIZE {
            return Err(WireError::TooShort {
                expected: RESPONSE_SIZE,
                actual: buf.len(),
            });
        }

        let app_port = u16::from_le_bytes([buf[0], buf[1]]);
        let mut mac = [0u8; MAC_SIZE];
        mac.copy_from_slice(&buf[2..RESPONSE_SIZE]);

        Ok(Self { app_port, mac })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_roundtrip() {
        let challenge = Challenge::generate([7u8; DEDUPE_ID_SIZE]).unwrap();
        let decoded = Challenge::decode(&challenge.encode()).unwrap();
        assert_eq!(decoded, challenge);
    }

    #[test]
    fn test_challenge_layout() {
        let challenge = Challenge {
            dedupe: [0xAA; DEDUPE_ID_SIZE],
            nonce: [0xBB; NONCE_SIZE],
        };
        let buf = challenge.encode();

        assert_eq!(&buf[..6], b"wherez");
        assert_eq!(&buf[6..16], &[0xAA; 10]);
        assert_eq!(&buf[16..36], &[0xBB; 20]);
    }

    #[test]
    fn test_challenge_rejects_bad_magic() {
        let mut buf = Challenge::generate([0u8; DEDUPE_ID_SIZE]).unwrap().encode();
        buf[..6].copy_from_slice(b"XXXXXX");
        assert_eq!(Challenge::decode(&buf), Err(WireError::BadMagic));
    }

    #[test]
    fn test_challenge_rejects_short_input() {
        let err = Challenge::decode(&[0u8; 12]).unwrap_err();
        assert_eq!(
            err,
            WireError::TooShort {
                expected: CHALLENGE_SIZE,
                actual: 12
            }
        );
    }

    #[test]
    fn test_challenge_nonces_are_fresh() {
        let a = Challenge::generate([0u8; DEDUPE_ID_SIZE]).unwrap();
        let b = Challenge::generate([0u8; DEDUPE_ID_SIZE]).unwrap();
        assert_ne!(a.nonce, b.nonce);
    }

    #[test]
    fn test_response_roundtrip() {
        let response = Response {
            app_port: 3000,
            mac: [0x42; MAC_SIZE],
        };
        let decoded = Response::decode(&response.encode()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_response_port_is_little_endian() {
        let response = Response {
            app_port: 0x1234,
            mac: [0u8; MAC_SIZE],
        };
        let buf = response.encode();
        assert_eq!(buf[0], 0x34);
        assert_eq!(buf[1], 0x12);
    }

    #[test]
    fn test_response_rejects_short_input() {
        assert!(Response::decode(&[0u8; RESPONSE_SIZE - 1]).is_err());
    }
}
