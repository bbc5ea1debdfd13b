//! The discovery driver.
//!
//! Owns the DHT handle, the authentication listener, and the fan-out of
//! candidate endpoints into outbound authentication attempts. The caller
//! sees none of it: [`find_authenticated_peers`] returns a lazy stream that
//! yields verified peers for as long as the process runs.

use std::sync::{Arc, Once};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use wherez_crypto::Passphrase;
use wherez_dht::{DhtClient, DhtConfig};

use crate::auth;
use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};
use crate::node::Node;
use crate::peer::Peer;

/// How many verified peers may queue before producers block.
const PEER_CHANNEL_CAPACITY: usize = 16;

/// A lazy, unbounded sequence of verified peers.
///
/// Produced asynchronously as discovery and authentication succeed. The
/// stream terminates only when discovery cannot start; under normal
/// operation it never ends. Endpoints may repeat: the DHT can surface the
/// same sibling across rounds, and every successful authentication is
/// reported.
///
/// Dropping the stream (or calling [`PeerStream::shutdown`]) stops the DHT
/// request loop, closes the listener, and aborts in-flight authentication
/// attempts.
pub struct PeerStream {
    peers: mpsc::Receiver<Peer>,
    cancel: CancellationToken,
}

impl PeerStream {
    /// Receive the next verified peer.
    ///
    /// Returns `None` once the stream is closed, which only happens after a
    /// fatal startup error or shutdown.
    pub async fn recv(&mut self) -> Option<Peer> {
        self.peers.recv().await
    }

    /// Stop discovery: the request loop exits, the listener closes, and
    /// in-flight dials are aborted.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PeerStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Find sibling nodes that are running with the same passphrase.
///
/// Returns immediately; peers arrive on the stream as the DHT surfaces
/// candidates and they pass authentication. The node will keep running as a
/// DHT participant indefinitely.
///
/// When `config.app_port` is set, this node also listens on the discovery
/// port and announces itself, so siblings can find it. The discovery port
/// must be reachable over both TCP and UDP from the public Internet.
///
/// Must be called from within a tokio runtime.
///
/// # Examples
///
/// ```no_run
/// use wherez_core::{find_authenticated_peers, DiscoveryConfig, Passphrase};
///
/// # async fn run() {
/// let config = DiscoveryConfig {
///     app_port: Some(3000),
///     ..Default::default()
/// };
/// let mut peers = find_authenticated_peers(config, Passphrase::from("secret"));
/// while let Some(peer) = peers.recv().await {
///     println!("{peer}");
/// }
/// # }
/// ```
#[must_use]
pub fn find_authenticated_peers(config: DiscoveryConfig, passphrase: Passphrase) -> PeerStream {
    let (tx, rx) = mpsc::channel(PEER_CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();

    tokio::spawn(drive(config, passphrase, tx, cancel.clone()));

    PeerStream { peers: rx, cancel }
}

/// Run discovery to completion, closing the peer stream on the way out.
async fn drive(
    config: DiscoveryConfig,
    passphrase: Passphrase,
    peers: mpsc::Sender<Peer>,
    cancel: CancellationToken,
) {
    if let Err(e) = try_drive(config, passphrase, peers, cancel).await {
        error!("discovery could not start: {e}");
    }
    // The peer sender drops here; the stream closes with it.
}

async fn try_drive(
    config: DiscoveryConfig,
    passphrase: Passphrase,
    peers: mpsc::Sender<Peer>,
    cancel: CancellationToken,
) -> Result<()> {
    config.validate()?;

    let infohash = wherez_crypto::derive(&passphrase);
    info!(%infohash, "derived discovery infohash");

    let node = Arc::new(Node::new().map_err(DiscoveryError::DedupeId)?);
    let passphrase = Arc::new(passphrase);

    if let Some(app_port) = config.app_port {
        let bound = auth::listen(
            node.clone(),
            config.discovery_port,
            app_port,
            passphrase.clone(),
            config.exchange_timeout,
            cancel.child_token(),
        )
        .await?;
        info!(%bound, app_port, "authentication listener up");
    }

    let dht = DhtClient::new(DhtConfig {
        port: config.discovery_port,
        min_peers: config.min_peers,
        bootstrap: config.bootstrap.clone(),
        request_interval: config.request_interval,
    })?;
    // Announce mode only when we run a listener; the DHT advertises our
    // discovery port, the application port rides in the auth response.
    let mut candidates =
        dht.spawn_requester(infohash, config.app_port.is_some(), cancel.child_token());

    let timeouts = config.timeouts();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            candidate = candidates.recv() => match candidate {
                Some(addr) => {
                    debug!(%addr, "DHT surfaced a candidate");
                    spawn_check(
                        addr.to_string(),
                        node.clone(),
                        passphrase.clone(),
                        timeouts,
                        peers.clone(),
                        cancel.child_token(),
                    );
                }
                None => return Ok(()),
            }
        }
    }
}

/// Authenticate one candidate in its own task, so a tar-pitted peer cannot
/// delay the others.
fn spawn_check(
    addr: String,
    node: Arc<Node>,
    passphrase: Arc<Passphrase>,
    timeouts: auth::Timeouts,
    peers: mpsc::Sender<Peer>,
    cancel: CancellationToken,
) {
    static RNG_FAILURE: Once = Once::new();

    tokio::spawn(async move {
        let verified = tokio::select! {
            _ = cancel.cancelled() => return,
            res = auth::verify_peer(&node, &addr, &passphrase, &timeouts) => res,
        };

        match verified {
            Ok(peer) => {
                let _ = peers.send(peer).await;
            }
            Err(e @ DiscoveryError::Rng(_)) => {
                RNG_FAILURE.call_once(|| warn!("{e}"));
            }
            Err(e) => debug!(%addr, "candidate rejected: {e}"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::time::Duration;

    // Startup failures must close the stream rather than hang the caller.
    #[tokio::test]
    async fn test_invalid_config_closes_stream() {
        let config = DiscoveryConfig {
            app_port: Some(0),
            ..Default::default()
        };
        let mut stream = find_authenticated_peers(config, Passphrase::from("secret"));
        assert!(stream.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_closes_stream() {
        // Pure-client mode on an ephemeral port; no listener, no announce.
        let config = DiscoveryConfig {
            discovery_port: 0,
            bootstrap: vec!["127.0.0.1:1".to_string()],
            ..Default::default()
        };
        let mut stream = find_authenticated_peers(config, Passphrase::from("secret"));
        stream.shutdown();

        let closed = tokio::time::timeout(Duration::from_secs(10), stream.recv()).await;
        assert_eq!(closed.expect("stream should close after shutdown"), None);
    }

    #[test]
    fn test_fatal_classification_matches_driver_behavior() {
        // Every error try_drive can return before the consume loop must be
        // fatal; the consume loop itself never errors.
        assert!(DiscoveryError::InvalidConfig(Cow::Borrowed("x")).is_fatal());
        assert!(DiscoveryError::Dht(wherez_dht::DhtError::Init("x".into())).is_fatal());
    }
}
