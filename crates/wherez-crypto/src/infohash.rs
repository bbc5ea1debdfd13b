//! Infohash derivation.
//!
//! Maps a passphrase to the 20-byte key under which sibling nodes meet in
//! the Mainline DHT. The derivation is deliberately two-stage:
//!
//! 1. SHA-256 of the passphrase, keeping only the first half (16 bytes).
//!    Assuming perfect rainbow databases, the public infohash should not
//!    give out too much about the passphrase.
//! 2. SHA-1 of those 16 bytes. The Mainline DHT key space is 160 bits wide,
//!    so SHA-1 is forced.

use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::{Passphrase, INFOHASH_SIZE};

/// A 20-byte Mainline DHT lookup key derived from a passphrase.
///
/// Deterministic: the same passphrase always yields the same infohash, so
/// sibling processes rendezvous without coordination. Somewhat hard to
/// guess, but not a secret; anyone watching the DHT sees it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Infohash([u8; INFOHASH_SIZE]);

impl Infohash {
    /// Get the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; INFOHASH_SIZE] {
        &self.0
    }
}

impl std::fmt::Display for Infohash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl std::fmt::Debug for Infohash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Infohash({})", hex::encode(self.0))
    }
}

/// Derive the DHT lookup key for a passphrase.
///
/// # Examples
///
/// ```
/// use wherez_crypto::{derive, Passphrase};
///
/// let ih = derive(&Passphrase::from("aaaaa"));
/// assert_eq!(ih.to_string(), "97207c9437e672af8e1731f6a7200a78623886ea");
/// ```
#[must_use]
pub fn derive(passphrase: &Passphrase) -> Infohash {
    let digest = Sha256::digest(passphrase.as_bytes());
    let truncated = &digest[..Sha256::output_size() / 2];
    let key = Sha1::digest(truncated);
    Infohash(key.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Known vector shared with the reference implementation.
    #[test]
    fn test_derive_vector() {
        let ih = derive(&Passphrase::from("aaaaa"));
        assert_eq!(
            hex::encode(ih.as_bytes()),
            "97207c9437e672af8e1731f6a7200a78623886ea"
        );
    }

    #[test]
    fn test_derive_deterministic() {
        let a = derive(&Passphrase::from("wherezexample"));
        let b = derive(&Passphrase::from("wherezexample"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_derive_independent() {
        let a = derive(&Passphrase::from("passphrase-one"));
        let b = derive(&Passphrase::from("passphrase-two"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_is_hex() {
        let ih = derive(&Passphrase::from("aaaaa"));
        let rendered = ih.to_string();
        assert_eq!(rendered.len(), 40);
        assert!(rendered.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_empty_passphrase_still_derives() {
        let ih = derive(&Passphrase::new(Vec::new()));
        assert_ne!(ih.as_bytes(), &[0u8; 20]);
    }
}
