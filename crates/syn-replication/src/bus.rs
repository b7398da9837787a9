//! In-process peer bus.
//!
//! A process-local `PeerManager` implementation for tests and
//! single-process multi-node setups. Distributed deployments substitute a
//! real transport behind the same trait.

use crate::errors::{ReplicationError, ReplicationResult};
use crate::peer::{Envelope, MessageStream, PeerId, PeerInfo, PeerManager};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

/// Buffered envelopes per subscription before backpressure.
const CHANNEL_CAPACITY: usize = 1024;

type Subscriptions = HashMap<(PeerId, String), mpsc::Sender<Envelope>>;

#[derive(Default)]
struct BusInner {
    peers: RwLock<Vec<PeerInfo>>,
    subscriptions: Mutex<Subscriptions>,
}

/// Shared in-process bus; hand out one [`PeerHandle`] per simulated node.
#[derive(Default, Clone)]
pub struct InMemoryPeerBus {
    inner: Arc<BusInner>,
}

impl InMemoryPeerBus {
    /// Empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer and return its manager handle.
    pub fn register(&self, id: impl Into<PeerId>) -> PeerHandle {
        let id = id.into();
        let mut peers = self.inner.peers.write().expect("peer bus lock poisoned");
        if !peers.iter().any(|p| p.id == id) {
            peers.push(PeerInfo {
                id: id.clone(),
                address: format!("mem://{id}"),
            });
        }
        PeerHandle {
            bus: self.clone(),
            id,
        }
    }

    fn deliver(&self, to: &PeerId, proto: &str, envelope: Envelope) -> ReplicationResult<()> {
        let sender = {
            let subscriptions = self
                .inner
                .subscriptions
                .lock()
                .expect("peer bus lock poisoned");
            subscriptions.get(&(to.clone(), proto.to_string())).cloned()
        };
        match sender {
            Some(sender) => sender
                .try_send(envelope)
                .map_err(|e| ReplicationError::Send(e.to_string())),
            // Unsubscribed peers silently drop traffic, like a real wire.
            None => Ok(()),
        }
    }
}

/// One peer's view of the bus.
pub struct PeerHandle {
    bus: InMemoryPeerBus,
    id: PeerId,
}

impl PeerHandle {
    /// This handle's peer id.
    pub fn id(&self) -> &PeerId {
        &self.id
    }
}

#[async_trait]
impl PeerManager for PeerHandle {
    fn peers(&self) -> Vec<PeerInfo> {
        self.bus
            .inner
            .peers
            .read()
            .expect("peer bus lock poisoned")
            .iter()
            .filter(|p| p.id != self.id)
            .cloned()
            .collect()
    }

    fn sample(&self, n: usize) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self.peers().into_iter().map(|p| p.id).collect();
        ids.shuffle(&mut rand::thread_rng());
        ids.truncate(n);
        ids
    }

    async fn send_async(
        &self,
        peer: &PeerId,
        proto: &str,
        code: u8,
        payload: Vec<u8>,
    ) -> ReplicationResult<()> {
        debug!(from = %self.id, to = %peer, proto, code, "Bus send");
        self.bus.deliver(
            peer,
            proto,
            Envelope {
                from: self.id.clone(),
                code,
                payload,
            },
        )
    }

    fn subscribe(&self, proto: &str) -> MessageStream {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        self.bus
            .inner
            .subscriptions
            .lock()
            .expect("peer bus lock poisoned")
            .insert((self.id.clone(), proto.to_string()), sender);
        receiver
    }

    fn unsubscribe(&self, proto: &str) {
        self.bus
            .inner
            .subscriptions
            .lock()
            .expect("peer bus lock poisoned")
            .remove(&(self.id.clone(), proto.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_reaches_subscriber() {
        let bus = InMemoryPeerBus::new();
        let alice = bus.register("alice");
        let bob = bus.register("bob");

        let mut stream = bob.subscribe("proto");
        alice
            .send_async(&"bob".to_string(), "proto", 1, vec![42])
            .await
            .unwrap();

        let envelope = stream.recv().await.unwrap();
        assert_eq!(envelope.from, "alice");
        assert_eq!(envelope.code, 1);
        assert_eq!(envelope.payload, vec![42]);
    }

    #[tokio::test]
    async fn test_unsubscribed_peer_drops_silently() {
        let bus = InMemoryPeerBus::new();
        let alice = bus.register("alice");
        let _bob = bus.register("bob");

        assert!(alice
            .send_async(&"bob".to_string(), "proto", 1, vec![])
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_peers_excludes_self_and_sample_is_bounded() {
        let bus = InMemoryPeerBus::new();
        let alice = bus.register("alice");
        for name in ["b", "c", "d"] {
            bus.register(name);
        }

        assert_eq!(alice.peers().len(), 3);
        assert_eq!(alice.sample(2).len(), 2);
        assert_eq!(alice.sample(10).len(), 3, "sample is without replacement");

        let sampled = alice.sample(3);
        let unique: std::collections::HashSet<_> = sampled.iter().collect();
        assert_eq!(unique.len(), sampled.len());
    }
}
