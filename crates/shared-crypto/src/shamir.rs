//! Shamir secret sharing over GF(256).
//!
//! Used to reconstruct 32-byte key seeds from M-of-N share sets. Shares
//! carry an explicit index byte; reconstruction refuses duplicate indices
//! rather than silently interpolating a corrupt secret.

use crate::CryptoError;
use sharks::{Share, Sharks};
use std::collections::HashSet;

/// Secret seed length in bytes.
pub const SECRET_LEN: usize = 32;

/// One share of a split secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretShare {
    /// The share's x-coordinate (1-based, never zero).
    pub index: u8,
    /// The share's y-coordinates, one byte per secret byte.
    pub data: Vec<u8>,
}

impl SecretShare {
    fn to_wire(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.data.len());
        bytes.push(self.index);
        bytes.extend_from_slice(&self.data);
        bytes
    }

    fn from_wire(bytes: &[u8]) -> Option<Self> {
        let (&index, data) = bytes.split_first()?;
        Some(SecretShare {
            index,
            data: data.to_vec(),
        })
    }
}

/// Split a 32-byte secret into `count` shares with the given threshold.
///
/// # Errors
///
/// Returns `InvalidInput` when `threshold` is zero or exceeds `count`.
pub fn split_secret(
    secret: &[u8; SECRET_LEN],
    count: u8,
    threshold: u8,
) -> Result<Vec<SecretShare>, CryptoError> {
    if threshold == 0 || threshold > count {
        return Err(CryptoError::InvalidInput(format!(
            "threshold {threshold} out of range for {count} shares"
        )));
    }
    let sharks = Sharks(threshold);
    let dealer = sharks.dealer(secret);
    Ok(dealer
        .take(count as usize)
        .filter_map(|share| SecretShare::from_wire(&Vec::from(&share)))
        .collect())
}

/// Reconstruct a 32-byte secret from at least `threshold` shares.
///
/// # Errors
///
/// - `InsufficientShares` when fewer than `threshold` shares are given
/// - `DuplicateShareIndex` when two shares carry the same index
/// - `ShareReconstructionFailed` when interpolation fails
pub fn combine_shares(
    shares: &[SecretShare],
    threshold: u8,
) -> Result<[u8; SECRET_LEN], CryptoError> {
    if shares.len() < threshold as usize {
        return Err(CryptoError::InsufficientShares {
            threshold,
            provided: shares.len(),
        });
    }

    let mut seen = HashSet::new();
    for share in shares {
        if !seen.insert(share.index) {
            return Err(CryptoError::DuplicateShareIndex(share.index));
        }
    }

    let wire_shares: Vec<Share> = shares
        .iter()
        .map(|share| {
            Share::try_from(share.to_wire().as_slice())
                .map_err(|e| CryptoError::ShareReconstructionFailed(e.to_string()))
        })
        .collect::<Result<_, _>>()?;

    let secret = Sharks(threshold)
        .recover(&wire_shares)
        .map_err(|e| CryptoError::ShareReconstructionFailed(e.to_string()))?;

    if secret.len() != SECRET_LEN {
        return Err(CryptoError::ShareReconstructionFailed(format!(
            "expected {SECRET_LEN}-byte secret, got {}",
            secret.len()
        )));
    }

    let mut out = [0u8; SECRET_LEN];
    out.copy_from_slice(&secret);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_combine() {
        let secret = [0x42u8; SECRET_LEN];
        let shares = split_secret(&secret, 5, 3).unwrap();
        assert_eq!(shares.len(), 5);

        let recovered = combine_shares(&shares[..3], 3).unwrap();
        assert_eq!(recovered, secret);
    }

    #[test]
    fn test_any_threshold_subset_recovers() {
        let secret = [0x17u8; SECRET_LEN];
        let shares = split_secret(&secret, 5, 3).unwrap();

        let subset = vec![shares[4].clone(), shares[1].clone(), shares[3].clone()];
        assert_eq!(combine_shares(&subset, 3).unwrap(), secret);
    }

    #[test]
    fn test_insufficient_shares_rejected() {
        let secret = [0x01u8; SECRET_LEN];
        let shares = split_secret(&secret, 5, 3).unwrap();

        let err = combine_shares(&shares[..2], 3).unwrap_err();
        assert_eq!(
            err,
            CryptoError::InsufficientShares {
                threshold: 3,
                provided: 2
            }
        );
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let secret = [0x01u8; SECRET_LEN];
        let shares = split_secret(&secret, 5, 3).unwrap();

        let duped = vec![shares[0].clone(), shares[0].clone(), shares[1].clone()];
        let err = combine_shares(&duped, 3).unwrap_err();
        assert_eq!(err, CryptoError::DuplicateShareIndex(shares[0].index));
    }

    #[test]
    fn test_bad_threshold_rejected_at_split() {
        let secret = [0u8; SECRET_LEN];
        assert!(split_secret(&secret, 3, 0).is_err());
        assert!(split_secret(&secret, 3, 4).is_err());
    }
}
