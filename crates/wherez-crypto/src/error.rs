//! Cryptographic error types.

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Random number generation failed
    #[error("random number generation failed")]
    RandomFailed,
}
