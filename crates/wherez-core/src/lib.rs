//! # Wherez Core
//!
//! Wherez lets a process register and discover sibling processes in the
//! network based on a shared passphrase. It uses the Mainline DHT to
//! advertise its own existence and to look for other nodes running with the
//! same passphrase, then authenticates each candidate over TCP with an
//! HMAC challenge-response.
//!
//! Example applications:
//! - find the location of your company's name servers or coordination
//!   daemons without a registry
//! - robust way for stolen notebooks to "phone home"
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      PeerStream (API)                        │
//! │        lazy, unbounded sequence of verified peers           │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    Discovery driver                          │
//! │   DHT request loop · candidate fan-out · TCP listener       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 Authentication protocol                      │
//! │   36-byte challenge in, 34-byte MAC'd response out          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod config;
pub mod discovery;
pub mod error;
pub mod node;
pub mod peer;
pub mod wire;

pub use config::DiscoveryConfig;
pub use discovery::{find_authenticated_peers, PeerStream};
pub use error::{DiscoveryError, Result};
pub use node::Node;
pub use peer::Peer;

pub use wherez_crypto::Passphrase;

/// Magic header identifying wherez TCP messages
pub const MAGIC: [u8; 6] = *b"wherez";

/// Challenge message size: magic + dedupe ID + nonce
pub const CHALLENGE_SIZE: usize = 36;

/// Response message size: app port + MAC
pub const RESPONSE_SIZE: usize = 34;
