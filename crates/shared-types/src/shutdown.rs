//! Cooperative shutdown signalling for long-running loops.
//!
//! Every background loop (proposer, sealer, vote subscriber, replication
//! reader, range sync) holds a `Shutdown` handle and exits after draining
//! its current iteration once the signal fires.

use tokio::sync::watch;

/// A cloneable cancellation handle backed by a watch channel.
#[derive(Debug, Clone)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
}

/// The triggering side; owned by whoever started the loops.
#[derive(Debug)]
pub struct ShutdownSignal {
    sender: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a fresh (signal, handle) pair.
    pub fn new() -> (ShutdownSignal, Shutdown) {
        let (sender, receiver) = watch::channel(false);
        (ShutdownSignal { sender }, Shutdown { receiver })
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve when cancellation is requested. Returns immediately if it
    /// already was.
    pub async fn cancelled(&mut self) {
        if *self.receiver.borrow() {
            return;
        }
        // The sender dropping also counts as cancellation.
        while self.receiver.changed().await.is_ok() {
            if *self.receiver.borrow() {
                return;
            }
        }
    }
}

impl ShutdownSignal {
    /// Request cancellation of every associated `Shutdown` handle.
    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }
}

impl Drop for ShutdownSignal {
    fn drop(&mut self) {
        let _ = self.sender.send(true);
    }
}
