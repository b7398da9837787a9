//! Peer manager contract.
//!
//! Replication talks to the network through this capability: enumerate
//! peers, random fanout sampling, fire-and-forget sends, and per-protocol
//! subscription streams.

use crate::errors::ReplicationResult;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Opaque peer identifier.
pub type PeerId = String;

/// Directory entry for one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    /// The peer's identifier.
    pub id: PeerId,
    /// Network address (host:port).
    pub address: String,
}

/// A message delivered on a subscribed protocol.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Sending peer.
    pub from: PeerId,
    /// 1-byte message code.
    pub code: u8,
    /// Message payload (code excluded).
    pub payload: Vec<u8>,
}

/// Stream of envelopes for one protocol subscription.
pub type MessageStream = mpsc::Receiver<Envelope>;

/// The peer-manager capability replication runs against.
#[async_trait]
pub trait PeerManager: Send + Sync {
    /// All currently known peers.
    fn peers(&self) -> Vec<PeerInfo>;

    /// Random sample of `n` distinct peer ids (fewer if not enough peers).
    fn sample(&self, n: usize) -> Vec<PeerId>;

    /// Send `code || payload` to one peer on `proto`.
    async fn send_async(
        &self,
        peer: &PeerId,
        proto: &str,
        code: u8,
        payload: Vec<u8>,
    ) -> ReplicationResult<()>;

    /// Subscribe to a protocol; messages arrive until unsubscribe or drop.
    fn subscribe(&self, proto: &str) -> MessageStream;

    /// Drop the subscription for a protocol.
    fn unsubscribe(&self, proto: &str);
}
