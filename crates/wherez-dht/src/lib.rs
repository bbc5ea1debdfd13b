//! Mainline DHT access for wherez peer discovery.
//!
//! The Kademlia machinery itself (routing table, KRPC wire format, iterative
//! lookups) belongs to the [`mainline`] crate; this crate owns the narrow
//! seam wherez needs from it:
//!
//! - bind a DHT node on the discovery port,
//! - periodically ask for holders of one infohash,
//! - optionally announce this node as a holder,
//! - deliver candidate endpoints as an asynchronous stream.
//!
//! The [`mainline`] handle is blocking, so the request loop runs on its own
//! thread and bridges into tokio through an mpsc channel. The channel is the
//! stream's lifetime: when the loop stops, the channel closes and the
//! candidate stream terminates.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use mainline::{Dht, Id};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wherez_crypto::Infohash;

/// How many candidate endpoints may queue before the requester blocks.
const CANDIDATE_CHANNEL_CAPACITY: usize = 64;

/// How long an announcement is considered fresh once the peer target is met.
const ANNOUNCE_REFRESH: Duration = Duration::from_secs(15 * 60);

/// How long an observed endpoint keeps counting toward the peer target
/// before a fresh lookup must confirm it again.
const PEER_FRESHNESS: Duration = Duration::from_secs(5 * 60);

/// Granularity of the inter-round sleep, so cancellation is honored promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(250);

/// DHT errors
#[derive(Debug, Error)]
pub enum DhtError {
    /// The DHT node could not be created (bad bootstrap config, UDP bind failure)
    #[error("could not create the DHT node: {0}")]
    Init(String),
}

/// Default bootstrap contacts: the well-known public routers, plus the
/// historical wherez seed node.
#[must_use]
pub fn default_bootstrap() -> Vec<String> {
    vec![
        "router.bittorrent.com:6881".to_string(),
        "router.utorrent.com:6881".to_string(),
        "dht.transmissionbt.com:6881".to_string(),
        "213.239.195.138:40000".to_string(),
    ]
}

/// DHT node configuration
#[derive(Debug, Clone)]
pub struct DhtConfig {
    /// UDP port to bind the DHT node on (the discovery port)
    pub port: u16,
    /// Keep requesting until at least this many distinct candidates were seen
    pub min_peers: usize,
    /// Bootstrap contacts (`host:port`)
    pub bootstrap: Vec<String>,
    /// Pause between request rounds
    pub request_interval: Duration,
}

impl Default for DhtConfig {
    fn default() -> Self {
        Self {
            port: 0,
            min_peers: 1,
            bootstrap: default_bootstrap(),
            request_interval: Duration::from_secs(5),
        }
    }
}

/// Tracks whether enough distinct candidates have been observed recently
/// for the request loop to go quiet.
///
/// Observations age out after the freshness window, so the gate reopens
/// when the population thins (or simply has not been confirmed in a while)
/// and discovery resumes. Siblings that join late are picked up on the next
/// reopened round; the gate is a pause, never a stop.
#[derive(Debug)]
struct SatisfiedGate {
    target: usize,
    window: Duration,
    seen: HashMap<SocketAddr, Instant>,
}

impl SatisfiedGate {
    fn new(target: usize, window: Duration) -> Self {
        Self {
            target,
            window,
            seen: HashMap::new(),
        }
    }

    fn record(&mut self, addr: SocketAddr) {
        self.seen.insert(addr, Instant::now());
    }

    fn satisfied(&mut self) -> bool {
        let window = self.window;
        self.seen.retain(|_, at| at.elapsed() < window);
        self.seen.len() >= self.target
    }
}

/// A bound Mainline DHT node.
pub struct DhtClient {
    dht: Dht,
    config: DhtConfig,
}

impl DhtClient {
    /// Create a DHT node bound to the configured UDP port.
    ///
    /// # Errors
    ///
    /// Returns [`DhtError::Init`] if the UDP socket cannot be bound or the
    /// bootstrap configuration is unusable. This is fatal to discovery;
    /// there is no degraded mode without a DHT.
    pub fn new(config: DhtConfig) -> Result<Self, DhtError> {
        let dht = Dht::builder()
            .port(config.port)
            .bootstrap(&config.bootstrap)
            .build()
            .map_err(|e| DhtError::Init(e.to_string()))?;

        Ok(Self { dht, config })
    }

    /// Start the request loop on a dedicated thread and return the stream
    /// of candidate endpoints it produces.
    ///
    /// Every `request_interval` the loop runs one `get_peers` round for
    /// `infohash` and pushes each reported endpoint into the stream. When
    /// `announce` is set, the round also registers this node as a holder
    /// under its own DHT port (the discovery port, where the authentication
    /// listener answers), so siblings can find us; the application port
    /// travels only inside the authenticated response, never through the
    /// DHT. Once `min_peers` distinct endpoints have been observed recently,
    /// lookup rounds pause until the observations go stale, then resume.
    ///
    /// Endpoints may repeat across rounds; the consumer must tolerate
    /// duplicates. The stream closes when `cancel` fires or the receiver is
    /// dropped.
    #[must_use]
    pub fn spawn_requester(
        self,
        infohash: Infohash,
        announce: bool,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<SocketAddr> {
        let (tx, rx) = mpsc::channel(CANDIDATE_CHANNEL_CAPACITY);

        // The mainline handle blocks on every query, so the loop gets a
        // plain thread rather than a tokio task.
        let spawned = std::thread::Builder::new()
            .name("wherez-dht".to_string())
            .spawn(move || self.request_loop(infohash, announce, cancel, tx));
        if let Err(e) = spawned {
            // `tx` died with the closure; the candidate stream closes.
            warn!("could not spawn the DHT request thread: {e}");
        }

        rx
    }

    fn request_loop(
        self,
        infohash: Infohash,
        announce: bool,
        cancel: CancellationToken,
        tx: mpsc::Sender<SocketAddr>,
    ) {
        let id = Id::from(*infohash.as_bytes());
        let mut gate = SatisfiedGate::new(self.config.min_peers, PEER_FRESHNESS);
        let mut last_announce: Option<Instant> = None;

        let bootstrapped = self.dht.bootstrapped();
        info!(%infohash, bootstrapped, "DHT node ready");

        while !cancel.is_cancelled() {
            let lookup_due = !gate.satisfied();
            let announce_due =
                announce && last_announce.map_or(true, |at| at.elapsed() >= ANNOUNCE_REFRESH);

            if lookup_due {
                for batch in self.dht.get_peers(id) {
                    for peer in batch {
                        let addr = SocketAddr::V4(peer);
                        gate.record(addr);
                        if tx.blocking_send(addr).is_err() {
                            // Consumer is gone; discovery is over.
                            return;
                        }
                    }
                }
            }

            if announce_due {
                // `None` announces the DHT socket's own port, which is the
                // discovery port the authentication listener shares. The
                // application port is never advertised here.
                match self.dht.announce_peer(id, None) {
                    Ok(_) => {
                        last_announce = Some(Instant::now());
                        debug!(%infohash, "announced as infohash holder");
                    }
                    Err(e) => debug!("announce_peer failed: {e}"),
                }
            }

            if !sleep_cancellable(self.config.request_interval, &cancel) {
                return;
            }
        }
    }
}

/// Sleep for `total`, waking early if `cancel` fires. Returns `false` when
/// cancelled.
fn sleep_cancellable(total: Duration, cancel: &CancellationToken) -> bool {
    let deadline = Instant::now() + total;
    while Instant::now() < deadline {
        if cancel.is_cancelled() {
            return false;
        }
        std::thread::sleep(SLEEP_SLICE.min(deadline.saturating_duration_since(Instant::now())));
    }
    !cancel.is_cancelled()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DhtConfig::default();
        assert_eq!(config.min_peers, 1);
        assert_eq!(config.request_interval, Duration::from_secs(5));
        assert!(!config.bootstrap.is_empty());
    }

    #[test]
    fn test_default_bootstrap_includes_seed() {
        let contacts = default_bootstrap();
        assert!(contacts.iter().any(|c| c == "213.239.195.138:40000"));
    }

    #[test]
    fn test_gate_counts_distinct_endpoints() {
        let mut gate = SatisfiedGate::new(2, Duration::from_secs(60));
        let a: SocketAddr = "10.0.0.1:4000".parse().unwrap();
        let b: SocketAddr = "10.0.0.2:4000".parse().unwrap();

        assert!(!gate.satisfied());
        gate.record(a);
        gate.record(a);
        assert!(!gate.satisfied());
        gate.record(b);
        assert!(gate.satisfied());
    }

    #[test]
    fn test_gate_reopens_when_observations_go_stale() {
        let mut gate = SatisfiedGate::new(1, Duration::from_millis(20));
        gate.record("10.0.0.1:4000".parse().unwrap());
        assert!(gate.satisfied());

        std::thread::sleep(Duration::from_millis(40));
        assert!(!gate.satisfied(), "stale endpoints must reopen the gate");

        // A fresh observation closes it again.
        gate.record("10.0.0.1:4000".parse().unwrap());
        assert!(gate.satisfied());
    }

    #[test]
    fn test_sleep_cancellable_honors_cancel() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let started = Instant::now();
        assert!(!sleep_cancellable(Duration::from_secs(10), &cancel));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_sleep_cancellable_completes() {
        let cancel = CancellationToken::new();
        assert!(sleep_cancellable(Duration::from_millis(10), &cancel));
    }
}
