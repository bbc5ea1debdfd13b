//! Challenge-response MACs.
//!
//! A responder proves knowledge of the passphrase by returning
//! HMAC-SHA256(passphrase, nonce) for the dialer-chosen 20-byte nonce.
//! The MAC covers the nonce only; the magic header and dedupe ID are
//! framing and a self-filter, not security.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{constant_time, Passphrase, MAC_SIZE, NONCE_SIZE};

type HmacSha256 = Hmac<Sha256>;

/// Compute the response MAC for a challenge nonce.
#[must_use]
pub fn respond(passphrase: &Passphrase, nonce: &[u8; NONCE_SIZE]) -> [u8; MAC_SIZE] {
    let mut mac =
        HmacSha256::new_from_slice(passphrase.as_bytes()).expect("HMAC accepts any key length");
    mac.update(nonce);
    mac.finalize().into_bytes().into()
}

/// Verify a response MAC against the nonce we sent.
///
/// Constant-time with respect to the MAC contents, so a remote peer cannot
/// learn anything from timing.
#[must_use]
pub fn verify(passphrase: &Passphrase, nonce: &[u8; NONCE_SIZE], mac: &[u8; MAC_SIZE]) -> bool {
    constant_time::verify_32(&respond(passphrase, nonce), mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nonce() -> [u8; NONCE_SIZE] {
        let mut n = [0u8; NONCE_SIZE];
        for (i, b) in n.iter_mut().enumerate() {
            *b = i as u8;
        }
        n
    }

    #[test]
    fn test_respond_deterministic() {
        let p = Passphrase::from("secret");
        assert_eq!(respond(&p, &nonce()), respond(&p, &nonce()));
    }

    #[test]
    fn test_verify_accepts_valid_mac() {
        let p = Passphrase::from("secret");
        let mac = respond(&p, &nonce());
        assert!(verify(&p, &nonce(), &mac));
    }

    #[test]
    fn test_verify_rejects_tampered_mac() {
        let p = Passphrase::from("secret");
        let mut mac = respond(&p, &nonce());
        mac[0] ^= 0x01;
        assert!(!verify(&p, &nonce(), &mac));
    }

    #[test]
    fn test_verify_rejects_wrong_passphrase() {
        let mac = respond(&Passphrase::from("secret"), &nonce());
        assert!(!verify(&Passphrase::from("someotherpass"), &nonce(), &mac));
    }

    #[test]
    fn test_different_nonces_different_macs() {
        let p = Passphrase::from("secret");
        let mut other = nonce();
        other[19] ^= 0xff;
        assert_ne!(respond(&p, &nonce()), respond(&p, &other));
    }
}
