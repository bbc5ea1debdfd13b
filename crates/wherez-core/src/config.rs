//! Discovery configuration.

use std::time::Duration;

use crate::auth::Timeouts;
use crate::error::{DiscoveryError, Result};

/// Configuration for one discovery run.
///
/// The discovery port carries both the DHT (UDP) and the authentication
/// protocol (TCP) on the same number, and must be reachable from the public
/// Internet; there is no NAT traversal. The application port is purely
/// informational payload: wherez advertises it to siblings but never opens
/// it.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// TCP+UDP port for the wherez protocol itself
    pub discovery_port: u16,
    /// Application port to advertise. `None` selects pure-client mode: the
    /// node still discovers siblings but is not findable by them.
    pub app_port: Option<u16>,
    /// Keep requesting the DHT until at least this many candidates surfaced
    pub min_peers: usize,
    /// DHT bootstrap contacts (`host:port`)
    pub bootstrap: Vec<String>,
    /// Cap on establishing each outbound TCP connection
    pub dial_timeout: Duration,
    /// Cap on each message of the challenge exchange
    pub exchange_timeout: Duration,
    /// Pause between DHT request rounds
    pub request_interval: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            discovery_port: 40000,
            app_port: None,
            min_peers: 1,
            bootstrap: wherez_dht::default_bootstrap(),
            dial_timeout: Duration::from_secs(5),
            exchange_timeout: Duration::from_secs(5),
            request_interval: Duration::from_secs(5),
        }
    }
}

impl DiscoveryConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::InvalidConfig`] when the advertised
    /// application port is 0 (nothing could connect to it) or no peer
    /// target is set.
    pub fn validate(&self) -> Result<()> {
        if self.app_port == Some(0) {
            return Err(DiscoveryError::invalid_config(
                "application port 0 cannot be advertised; use None for pure-client mode",
            ));
        }
        if self.min_peers == 0 {
            return Err(DiscoveryError::invalid_config("min_peers must be at least 1"));
        }
        Ok(())
    }

    /// The per-attempt deadlines for the authenticator.
    #[must_use]
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            dial: self.dial_timeout,
            exchange: self.exchange_timeout,
        }
    }
}
