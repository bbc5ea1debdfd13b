//! Error types for discovery and authentication.
//!
//! Startup errors are fatal: without an infohash, a listener, or a DHT node
//! there is no useful degraded mode, and the peer stream closes. Per-peer
//! errors are not: discovery is a best-effort stream and a candidate that
//! cannot be dialed or fails its MAC check is simply dropped.

use std::borrow::Cow;

use thiserror::Error;
use wherez_crypto::CryptoError;

/// Errors that can occur during discovery and peer authentication
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Configuration rejected before startup
    #[error("invalid configuration: {0}")]
    InvalidConfig(Cow<'static, str>),

    /// The authentication listener could not bind its TCP port
    #[error("could not bind the authentication listener: {0}")]
    Bind(#[source] std::io::Error),

    /// The DHT node could not be created
    #[error(transparent)]
    Dht(#[from] wherez_dht::DhtError),

    /// The process dedupe ID could not be generated
    #[error("could not generate the process dedupe ID: {0}")]
    DedupeId(#[source] CryptoError),

    /// A candidate peer could not be dialed
    #[error("could not dial peer: {0}")]
    Dial(#[source] std::io::Error),

    /// The challenge/response exchange failed mid-flight
    #[error("peer exchange failed: {0}")]
    Io(#[from] std::io::Error),

    /// A fresh challenge nonce could not be generated
    #[error("challenge nonce generation failed: {0}")]
    Rng(#[source] CryptoError),

    /// The peer's response MAC did not verify against our nonce
    #[error("peer failed authentication")]
    AuthFailed,

    /// A dial or exchange step exceeded its deadline
    #[error("{0} timed out")]
    Timeout(&'static str),
}

impl DiscoveryError {
    /// Returns true if this error is fatal to discovery as a whole.
    ///
    /// Fatal errors close the peer stream; everything else drops a single
    /// candidate and the stream keeps flowing.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DiscoveryError::InvalidConfig(_)
                | DiscoveryError::Bind(_)
                | DiscoveryError::Dht(_)
                | DiscoveryError::DedupeId(_)
        )
    }

    /// Create an invalid-configuration error with static context.
    #[must_use]
    pub const fn invalid_config(context: &'static str) -> Self {
        DiscoveryError::InvalidConfig(Cow::Borrowed(context))
    }
}

/// Result type for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;
