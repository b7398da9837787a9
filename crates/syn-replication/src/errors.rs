//! Replication error types.

use thiserror::Error;

/// Errors from the gossip and sync paths.
#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("No peers available")]
    NoPeers,

    #[error("Message decode failed: {0}")]
    Decode(String),

    #[error("Deadline exceeded waiting for {0}")]
    DeadlineExceeded(String),

    #[error("Send to peer failed: {0}")]
    Send(String),

    #[error("Block import failed: {0}")]
    Import(String),

    #[error("Subscription channel closed")]
    ChannelClosed,
}

/// Result type for replication operations.
pub type ReplicationResult<T> = Result<T, ReplicationError>;
