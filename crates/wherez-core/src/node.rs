//! Per-process node identity.

use wherez_crypto::{random, CryptoError, DEDUPE_ID_SIZE};

/// Process-local identity for the authentication protocol.
///
/// The DHT will happily hand us our own external address as a candidate, so
/// every outgoing challenge carries a random dedupe ID generated once per
/// process. An acceptor that reads its own ID back knows the connection is a
/// loop and drops it.
///
/// The ID lives only in memory; a restarted process gets a new one.
pub struct Node {
    dedupe: [u8; DEDUPE_ID_SIZE],
    allow_self_connection: bool,
}

impl Node {
    /// Create a node with a freshly generated dedupe ID.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::RandomFailed`] if the OS CSPRNG fails, which
    /// is fatal: without a dedupe ID every node would authenticate itself.
    pub fn new() -> Result<Self, CryptoError> {
        Ok(Self {
            dedupe: random::random_dedupe()?,
            allow_self_connection: false,
        })
    }

    /// Disable the self-connection filter.
    ///
    /// Only useful in tests, where client and listener share one process
    /// and therefore one dedupe ID. Production keeps the filter on.
    #[must_use]
    pub fn allow_self_connections(mut self) -> Self {
        self.allow_self_connection = true;
        self
    }

    /// This process's dedupe ID.
    #[must_use]
    pub fn dedupe(&self) -> &[u8; DEDUPE_ID_SIZE] {
        &self.dedupe
    }

    /// Whether an incoming challenge carrying `dedupe` must be dropped as a
    /// connection to self.
    #[must_use]
    pub fn rejects_as_self(&self, dedupe: &[u8; DEDUPE_ID_SIZE]) -> bool {
        !self.allow_self_connection && dedupe == &self.dedupe
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("dedupe", &hex::encode(self.dedupe))
            .field("allow_self_connection", &self.allow_self_connection)
            .finish()
    }
}
