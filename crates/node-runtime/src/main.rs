//! Synnergy node binary.
//!
//! Loads the configuration, wires the services, starts the background
//! loops and runs until interrupted. Fatal startup errors (opcode
//! collision, invalid difficulty, invalid treasury, WAL corruption) exit
//! non-zero with a single-line diagnostic.

use node_runtime::{NodeConfig, Services};
use shared_crypto::BlsKeyPair;
use shared_types::Shutdown;
use std::path::PathBuf;
use std::sync::Arc;
use syn_replication::InMemoryPeerBus;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn load_config() -> anyhow::Result<NodeConfig> {
    match std::env::args().nth(1) {
        Some(path) => Ok(NodeConfig::load(&PathBuf::from(path))?),
        None => Ok(NodeConfig::default()),
    }
}

async fn run() -> anyhow::Result<()> {
    let config = load_config()?;

    // A single-process bus stands in until a network transport is wired
    // behind the same PeerManager capability.
    let bus = InMemoryPeerBus::new();
    let peers = Arc::new(bus.register(config.network.discovery_tag.clone()));

    let services = Services::build(&config, peers, BlsKeyPair::generate())?;
    let (signal, shutdown) = Shutdown::new();
    services.start(shutdown);
    info!(
        listen = %config.network.listen_addr,
        height = services.ledger.last_height(),
        "Node running"
    );

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received; shutting down");
    signal.cancel();
    // Give loops a moment to drain their current iteration.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = run().await {
        eprintln!("synnergy-node: fatal: {e}");
        std::process::exit(1);
    }
}
