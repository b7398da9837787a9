//! # Shared Crypto - Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `ecdsa` | secp256k1 | Wallet/transaction signing |
//! | `bls` | BLS12-381 | Validator endorsements, aggregation |
//! | `dilithium` | Dilithium3 | Long-term key operations |
//! | `symmetric` | XChaCha20-Poly1305 | Payload encryption |
//! | `hashing` | SHA-256 | PoH, PoW, identities |
//! | `merkle` | double-SHA-256 | Canonical Merkle roots |
//! | `shamir` | GF(256) | Seed share reconstruction |
//! | `tls` | TLS 1.3 | Transport security |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic nonces
//! - **BLS12-381**: proof-of-possession scheme, order-independent aggregation
//! - **XChaCha20**: 192-bit nonce, constant-time tag check
//! - **Dilithium3**: NIST level 3 post-quantum signatures

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bls;
pub mod dilithium;
pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod merkle;
pub mod shamir;
pub mod signatures;
pub mod symmetric;
pub mod tls;

// Re-exports
pub use bls::{BlsKeyPair, BlsPublicKey, BlsSignature};
pub use dilithium::{DilithiumKeyPair, DilithiumPublicKey, DilithiumSignature};
pub use ecdsa::{Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature};
pub use errors::CryptoError;
pub use hashing::{double_sha256, hmac_sha256, sha256, Sha256Hasher};
pub use merkle::merkle_root;
pub use shamir::{combine_shares, split_secret, SecretShare};
pub use signatures::{sign, verify};
pub use symmetric::{decrypt, encrypt, SecretKey, AEAD_KEY_LEN, AEAD_NONCE_LEN, AEAD_TAG_LEN};
pub use tls::TlsBuilder;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
