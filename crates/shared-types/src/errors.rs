//! Cross-crate error kinds.

use thiserror::Error;

/// Canonical encoding/decoding errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Value could not be serialized
    #[error("Encode failed: {0}")]
    Encode(String),

    /// Bytes could not be deserialized
    #[error("Decode failed: {0}")]
    Decode(String),
}

