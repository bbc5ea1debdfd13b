//! # Wherez Crypto
//!
//! Cryptographic primitives for wherez peer discovery.
//!
//! This crate provides:
//! - Passphrase container with zeroization on drop
//! - Infohash derivation (passphrase to DHT lookup key)
//! - HMAC-SHA256 challenge-response MACs
//! - Constant-time comparison
//! - Secure random number generation
//!
//! ## Cryptographic Suite
//!
//! | Function | Algorithm | Notes |
//! |----------|-----------|-------|
//! | Lookup key | SHA-256 truncated, then SHA-1 | SHA-1 width is fixed by the Mainline DHT |
//! | Response MAC | HMAC-SHA256 | keyed by the passphrase, over the 20-byte nonce |
//! | Randomness | OS CSPRNG | nonces and dedupe IDs |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constant_time;
pub mod error;
pub mod infohash;
pub mod mac;
pub mod random;

pub use error::CryptoError;
pub use infohash::{derive, Infohash};

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Infohash size (Mainline DHT keys are 160 bits)
pub const INFOHASH_SIZE: usize = 20;

/// Challenge nonce size
pub const NONCE_SIZE: usize = 20;

/// Response MAC size (HMAC-SHA256 output)
pub const MAC_SIZE: usize = 32;

/// Per-process dedupe ID size
pub const DEDUPE_ID_SIZE: usize = 10;

/// The shared passphrase, the sole secret of the protocol.
///
/// Zeroized on drop to prevent memory disclosure. The `Debug` impl redacts
/// the contents so a passphrase can never leak through logging.
///
/// # Examples
///
/// ```
/// use wherez_crypto::Passphrase;
///
/// let passphrase = Passphrase::from("secret");
/// assert_eq!(passphrase.as_bytes(), b"secret");
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(Vec<u8>);

impl Passphrase {
    /// Create a passphrase from raw bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the passphrase bytes.
    ///
    /// The returned slice is valid only as long as the `Passphrase` exists.
    /// Do not store or copy these bytes without proper zeroization.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Passphrase {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for Passphrase {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&[u8]> for Passphrase {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Passphrase")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passphrase_from_str() {
        let p = Passphrase::from("hello");
        assert_eq!(p.as_bytes(), b"hello");
    }

    #[test]
    fn test_passphrase_from_bytes() {
        let p = Passphrase::new(vec![1u8, 2, 3]);
        assert_eq!(p.as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_passphrase_debug_redacted() {
        let p = Passphrase::from("topsecret");
        let debug = format!("{p:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("topsecret"));
    }

    #[test]
    fn test_passphrase_clone() {
        let p = Passphrase::from("secret");
        let q = p.clone();
        assert_eq!(p.as_bytes(), q.as_bytes());
    }
}
