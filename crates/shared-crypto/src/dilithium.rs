//! # Dilithium Signatures (post-quantum)
//!
//! Dilithium3 detached signatures for long-term key operations (key
//! rotation receipts, archival attestations). Not on the hot path.

use crate::CryptoError;
use pqcrypto_dilithium::dilithium3;
use pqcrypto_traits::sign::{
    DetachedSignature as _, PublicKey as _, SecretKey as _,
};

/// Dilithium3 public key.
#[derive(Clone)]
pub struct DilithiumPublicKey(dilithium3::PublicKey);

/// Dilithium3 detached signature.
#[derive(Clone)]
pub struct DilithiumSignature(dilithium3::DetachedSignature);

/// Dilithium3 key pair.
pub struct DilithiumKeyPair {
    secret: dilithium3::SecretKey,
    public: DilithiumPublicKey,
}

impl DilithiumKeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let (public, secret) = dilithium3::keypair();
        Self {
            secret,
            public: DilithiumPublicKey(public),
        }
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> DilithiumSignature {
        DilithiumSignature(dilithium3::detached_sign(message, &self.secret))
    }

    /// Get the public key.
    pub fn public_key(&self) -> DilithiumPublicKey {
        self.public.clone()
    }

    /// Secret key bytes (for sealed storage only).
    pub fn secret_bytes(&self) -> Vec<u8> {
        self.secret.as_bytes().to_vec()
    }
}

/// Sign with a serialized Dilithium3 secret key.
///
/// # Errors
///
/// Returns `InvalidPrivateKey` when the bytes do not decode.
pub fn sign_with_secret(secret: &[u8], message: &[u8]) -> Result<DilithiumSignature, CryptoError> {
    let sk =
        dilithium3::SecretKey::from_bytes(secret).map_err(|_| CryptoError::InvalidPrivateKey)?;
    Ok(DilithiumSignature(dilithium3::detached_sign(message, &sk)))
}

impl DilithiumPublicKey {
    /// Verify a detached signature.
    pub fn verify(&self, message: &[u8], signature: &DilithiumSignature) -> bool {
        dilithium3::verify_detached_signature(&signature.0, message, &self.0).is_ok()
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        dilithium3::PublicKey::from_bytes(bytes)
            .map(DilithiumPublicKey)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Serialize to raw bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }
}

impl DilithiumSignature {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        dilithium3::DetachedSignature::from_bytes(bytes)
            .map(DilithiumSignature)
            .map_err(|_| CryptoError::InvalidSignatureFormat)
    }

    /// Serialize to raw bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let keypair = DilithiumKeyPair::generate();
        let signature = keypair.sign(b"rotate validator key");
        assert!(keypair.public_key().verify(b"rotate validator key", &signature));
    }

    #[test]
    fn test_wrong_message_rejected() {
        let keypair = DilithiumKeyPair::generate();
        let signature = keypair.sign(b"message1");
        assert!(!keypair.public_key().verify(b"message2", &signature));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let keypair = DilithiumKeyPair::generate();
        let signature = keypair.sign(b"message");

        let pk = DilithiumPublicKey::from_bytes(&keypair.public_key().to_bytes()).unwrap();
        let sig = DilithiumSignature::from_bytes(&signature.to_bytes()).unwrap();
        assert!(pk.verify(b"message", &sig));
    }

    #[test]
    fn test_malformed_key_rejected() {
        assert!(DilithiumPublicKey::from_bytes(&[0u8; 7]).is_err());
    }
}
