//! Wherez CLI
//!
//! Joins the swarm for a passphrase and prints one `host:port` line for
//! every sibling that proves it knows the same passphrase. Runs until
//! interrupted.

use clap::Parser;
use tracing::info;

use wherez_core::{find_authenticated_peers, DiscoveryConfig, Passphrase};

/// Register and discover sibling nodes based on a shared passphrase
#[derive(Parser)]
#[command(name = "wherez")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port for the wherez protocol itself (TCP+UDP); must be reachable
    /// from the public Internet
    #[arg(short, long, default_value_t = 40000)]
    port: u16,

    /// Keep querying the DHT until at least this many candidates surfaced
    #[arg(long, default_value_t = 1)]
    min_peers: usize,

    /// Discover siblings without announcing this node as one
    #[arg(long)]
    client: bool,

    /// Additional DHT bootstrap contacts (host:port); replaces the default
    /// list when given
    #[arg(long)]
    bootstrap: Vec<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Port your application listens on; advertised to siblings, never
    /// opened by wherez
    app_port: u16,

    /// The shared passphrase
    passphrase: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let mut config = DiscoveryConfig {
        discovery_port: cli.port,
        app_port: (!cli.client).then_some(cli.app_port),
        min_peers: cli.min_peers,
        ..Default::default()
    };
    if !cli.bootstrap.is_empty() {
        config.bootstrap = cli.bootstrap;
    }
    config.validate()?;

    info!(port = cli.port, "starting discovery");
    let mut peers = find_authenticated_peers(config, Passphrase::from(cli.passphrase));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                peers.shutdown();
                return Ok(());
            }
            peer = peers.recv() => match peer {
                Some(peer) => println!("{peer}"),
                // Closed stream means discovery could not start; the driver
                // already logged why.
                None => anyhow::bail!("discovery stopped"),
            }
        }
    }
}
