//! Challenge-response authentication over TCP.
//!
//! Alice dials Bob's discovery port and proves nothing; Bob proves he knows
//! the passphrase. One 36-byte challenge in, one 34-byte response out, then
//! the connection closes:
//!
//! - Alice sends `magic || dedupe || nonce`.
//! - Bob replies with his application port and
//!   HMAC-SHA256(passphrase, nonce).
//!
//! Alice verifies the MAC against the nonce she just generated; on success
//! Bob's host plus his advertised application port become a [`Peer`].
//!
//! The acceptor never reports errors to the remote side. A scraper, a peer
//! with the wrong passphrase, and an unreachable host all look identical
//! from the outside; only a peer that already knows the passphrase can
//! verify the MAC and accept us.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use wherez_crypto::{mac, Passphrase};

use crate::error::{DiscoveryError, Result};
use crate::node::Node;
use crate::peer::Peer;
use crate::wire::{Challenge, Response};
use crate::{CHALLENGE_SIZE, RESPONSE_SIZE};

/// Deadlines for one authentication attempt.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Cap on establishing the TCP connection
    pub dial: Duration,
    /// Cap on each message of the exchange
    pub exchange: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            dial: Duration::from_secs(5),
            exchange: Duration::from_secs(5),
        }
    }
}

/// Dial `addr` and run the challenge against it.
///
/// `addr` is a `host:port` string as produced by the DHT; the host part is
/// preserved verbatim in the returned [`Peer`], while the dialed port is
/// discarded in favor of the application port the peer advertises.
///
/// # Errors
///
/// All errors are per-peer and non-fatal to discovery:
///
/// - [`DiscoveryError::Dial`] when the connection cannot be established.
/// - [`DiscoveryError::Rng`] when no fresh nonce could be generated.
/// - [`DiscoveryError::Io`] when the exchange dies mid-flight. The remote
///   may simply have dropped us because we collected ourselves as a
///   candidate; that is normal.
/// - [`DiscoveryError::Timeout`] when a step exceeds its deadline.
/// - [`DiscoveryError::AuthFailed`] when the MAC does not verify.
pub async fn verify_peer(
    node: &Node,
    addr: &str,
    passphrase: &Passphrase,
    timeouts: &Timeouts,
) -> Result<Peer> {
    let mut stream = timeout(timeouts.dial, TcpStream::connect(addr))
        .await
        .map_err(|_| DiscoveryError::Timeout("dial"))?
        .map_err(DiscoveryError::Dial)?;

    let challenge = Challenge::generate(*node.dedupe()).map_err(DiscoveryError::Rng)?;

    timeout(timeouts.exchange, stream.write_all(&challenge.encode()))
        .await
        .map_err(|_| DiscoveryError::Timeout("challenge write"))??;

    let mut buf = [0u8; RESPONSE_SIZE];
    timeout(timeouts.exchange, stream.read_exact(&mut buf))
        .await
        .map_err(|_| DiscoveryError::Timeout("response read"))??;

    let response = Response::decode(&buf).map_err(|_| DiscoveryError::AuthFailed)?;
    if !mac::verify(passphrase, &challenge.nonce, &response.mac) {
        return Err(DiscoveryError::AuthFailed);
    }

    let host = split_host(addr).ok_or_else(|| {
        DiscoveryError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "peer address missing port",
        ))
    })?;

    Ok(Peer {
        host: host.to_string(),
        app_port: response.app_port,
    })
}

/// Bind the authentication listener and start its accept loop in the
/// background. Returns the bound address (useful when `discovery_port` is 0
/// and the OS picks one).
///
/// The accept loop spawns one handler task per connection and runs until
/// `cancel` fires or accepting fails fatally; per-connection failures are
/// dropped silently.
///
/// # Errors
///
/// Returns [`DiscoveryError::Bind`] when the TCP port cannot be bound,
/// which is fatal to discovery in announce mode.
pub async fn listen(
    node: Arc<Node>,
    discovery_port: u16,
    app_port: u16,
    passphrase: Arc<Passphrase>,
    exchange_timeout: Duration,
    cancel: CancellationToken,
) -> Result<SocketAddr> {
    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], discovery_port)))
        .await
        .map_err(DiscoveryError::Bind)?;
    let bound = listener.local_addr().map_err(DiscoveryError::Bind)?;

    tokio::spawn(accept_loop(
        listener,
        node,
        app_port,
        passphrase,
        exchange_timeout,
        cancel,
    ));

    Ok(bound)
}

async fn accept_loop(
    listener: TcpListener,
    node: Arc<Node>,
    app_port: u16,
    passphrase: Arc<Passphrase>,
    exchange_timeout: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            accepted = listener.accept() => match accepted {
                Ok((stream, remote)) => {
                    debug!(%remote, "incoming authentication connection");
                    let node = node.clone();
                    let passphrase = passphrase.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, &node, app_port, &passphrase, exchange_timeout)
                            .await;
                    });
                }
                Err(e) => {
                    error!("accept failed, stopping the authentication listener: {e}");
                    return;
                }
            }
        }
    }
}

/// One challenge in, one response out; any irregularity closes the
/// connection without a reply.
async fn handle_connection(
    mut stream: TcpStream,
    node: &Node,
    app_port: u16,
    passphrase: &Passphrase,
    exchange_timeout: Duration,
) {
    let mut buf = [0u8; CHALLENGE_SIZE];
    match timeout(exchange_timeout, stream.read_exact(&mut buf)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            debug!("dropping connection on short challenge: {e}");
            return;
        }
        Err(_) => {
            debug!("dropping connection on challenge read timeout");
            return;
        }
    }

    let challenge = match Challenge::decode(&buf) {
        Ok(c) => c,
        Err(e) => {
            // Not a wherez peer; DHT scrapers probe any advertised port.
            debug!("dropping connection: {e}");
            return;
        }
    };

    if node.rejects_as_self(&challenge.dedupe) {
        debug!("dropping connection to self");
        return;
    }

    let response = Response {
        app_port,
        mac: mac::respond(passphrase, &challenge.nonce),
    };

    match timeout(exchange_timeout, stream.write_all(&response.encode())).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("failed to write challenge response: {e}"),
        Err(_) => debug!("challenge response write timed out"),
    }
}

/// Split the host out of a `host:port` string, keeping IPv6 brackets.
fn split_host(addr: &str) -> Option<&str> {
    addr.rsplit_once(':').map(|(host, _)| host)
}
