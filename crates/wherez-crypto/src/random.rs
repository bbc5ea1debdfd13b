//! Secure random number generation.
//!
//! All randomness comes from the operating system CSPRNG.

use crate::{CryptoError, DEDUPE_ID_SIZE, NONCE_SIZE};

/// Fill a buffer with random bytes from the OS CSPRNG
pub fn fill_random(buf: &mut [u8]) -> Result<(), CryptoError> {
    getrandom::getrandom(buf).map_err(|_| CryptoError::RandomFailed)
}

/// Generate a fresh 20-byte challenge nonce
pub fn random_nonce() -> Result<[u8; NONCE_SIZE], CryptoError> {
    let mut buf = [0u8; NONCE_SIZE];
    fill_random(&mut buf)?;
    Ok(buf)
}

/// Generate a 10-byte process dedupe ID
pub fn random_dedupe() -> Result<[u8; DEDUPE_ID_SIZE], CryptoError> {
    let mut buf = [0u8; DEDUPE_ID_SIZE];
    fill_random(&mut buf)?;
    Ok(buf)
}
