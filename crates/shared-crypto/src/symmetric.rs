//! # Symmetric Encryption
//!
//! XChaCha20-Poly1305 authenticated encryption for transaction payloads.
//!
//! Blob layout: `nonce (24B) || ciphertext || tag (16B)`. The tag is
//! checked in constant time before any plaintext is released.

use crate::CryptoError;
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use zeroize::Zeroize;

/// Required key length in bytes.
pub const AEAD_KEY_LEN: usize = 32;

/// Nonce prefix length in bytes (XChaCha20 extended nonce).
pub const AEAD_NONCE_LEN: usize = 24;

/// Poly1305 tag length in bytes.
pub const AEAD_TAG_LEN: usize = 16;

/// Secret key (256-bit).
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey([u8; AEAD_KEY_LEN]);

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(REDACTED)")
    }
}

impl SecretKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; AEAD_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, enforcing the 32-byte key size.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != AEAD_KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: AEAD_KEY_LEN,
                actual: bytes.len(),
            });
        }
        let mut key = [0u8; AEAD_KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Generate random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; AEAD_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; AEAD_KEY_LEN] {
        &self.0
    }
}

/// Encrypt plaintext, binding `aad` into the tag.
///
/// Returns a self-contained blob: `nonce || ciphertext || tag`.
///
/// # Errors
///
/// Returns `CryptoError::EncryptionFailed` if encryption fails.
pub fn encrypt(key: &SecretKey, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    let mut nonce = [0u8; AEAD_NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut blob = Vec::with_capacity(AEAD_NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by [`encrypt`], verifying the tag against `aad`.
///
/// # Errors
///
/// Returns `CryptoError::TagMismatch` on truncated input, a tampered
/// ciphertext, a wrong key, or mismatched `aad`.
pub fn decrypt(key: &SecretKey, blob: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < AEAD_NONCE_LEN + AEAD_TAG_LEN {
        return Err(CryptoError::TagMismatch);
    }
    let (nonce, ciphertext) = blob.split_at(AEAD_NONCE_LEN);

    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::TagMismatch)
}
