//! Verified sibling peers.

/// A sibling node that proved knowledge of the shared passphrase.
///
/// `host` is the remote address as observed by the local TCP stack. The
/// port is the peer's advertised application port, not the discovery port
/// the authentication ran over; wherez never connects to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Peer {
    /// Remote host, as dialed
    pub host: String,
    /// The peer's advertised application port
    pub app_port: u16,
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.app_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_host_and_app_port() {
        let peer = Peer {
            host: "localhost".to_string(),
            app_port: 3000,
        };
        assert_eq!(peer.to_string(), "localhost:3000");
    }

    #[test]
    fn test_display_keeps_bracketed_ipv6() {
        let peer = Peer {
            host: "[::1]".to_string(),
            app_port: 53,
        };
        assert_eq!(peer.to_string(), "[::1]:53");
    }
}
