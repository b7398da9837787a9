//! Canonical encoding helpers.
//!
//! All wire and persisted encodings go through bincode with its default
//! fixed-width little-endian integer representation, which is
//! deterministic for a given value. Identities are the double-SHA-256 of
//! the canonical encoding.

use crate::errors::CodecError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// A 32-byte digest.
pub type Hash = [u8; 32];

/// Canonically encode a value.
///
/// # Errors
///
/// Returns `CodecError::Encode` if the value cannot be serialized.
pub fn canonical_encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode a canonically encoded value.
///
/// Trailing bytes are rejected so that every byte string decodes to at
/// most one value.
///
/// # Errors
///
/// Returns `CodecError::Decode` on malformed or trailing input.
pub fn canonical_decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut cursor = std::io::Cursor::new(bytes);
    let value = bincode::deserialize_from(&mut cursor)
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    if cursor.position() as usize != bytes.len() {
        return Err(CodecError::Decode("trailing bytes".into()));
    }
    Ok(value)
}

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Double SHA-256 of `data` (hash of the hash).
pub fn double_sha256(data: &[u8]) -> Hash {
    sha256(&sha256(data))
}

/// Double-SHA-256 identity of a canonically encoded value.
///
/// # Errors
///
/// Returns `CodecError::Encode` if the value cannot be serialized.
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<Hash, CodecError> {
    Ok(double_sha256(&canonical_encode(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_deterministic() {
        let a = canonical_encode(&(42u64, "synnergy".to_string())).unwrap();
        let b = canonical_encode(&(42u64, "synnergy".to_string())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut bytes = canonical_encode(&7u64).unwrap();
        bytes.push(0);
        assert!(canonical_decode::<u64>(&bytes).is_err());
    }

    #[test]
    fn test_roundtrip() {
        let value = vec![[1u8; 32], [2u8; 32]];
        let bytes = canonical_encode(&value).unwrap();
        let back: Vec<[u8; 32]> = canonical_decode(&bytes).unwrap();
        assert_eq!(value, back);
    }

    #[test]
    fn test_double_sha256_differs_from_single() {
        let data = b"synnergy";
        assert_ne!(sha256(data), double_sha256(data));
    }
}
