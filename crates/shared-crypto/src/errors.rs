//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// AEAD tag mismatch or truncated blob
    #[error("Decryption failed: tag mismatch")]
    TagMismatch,

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Signature bytes are the wrong size or malformed
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Signature did not verify
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// BLS aggregation failed
    #[error("BLS aggregation failed")]
    AggregationFailed,

    /// Fewer shares than the reconstruction threshold
    #[error("Insufficient shares: need {threshold}, got {provided}")]
    InsufficientShares {
        /// Reconstruction threshold
        threshold: u8,
        /// Shares provided
        provided: usize,
    },

    /// Two shares carry the same index
    #[error("Duplicate share index: {0}")]
    DuplicateShareIndex(u8),

    /// Secret reconstruction failed
    #[error("Share reconstruction failed: {0}")]
    ShareReconstructionFailed(String),

    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    /// Invalid input for cryptographic operation
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
