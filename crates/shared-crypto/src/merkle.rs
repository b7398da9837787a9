//! Canonical Merkle roots.
//!
//! Leaves are double-SHA-256 hashed, sorted by byte order, then folded
//! pairwise; odd-count levels duplicate their last element. Sorting makes
//! the root independent of input order, so any permutation of the same
//! leaf set yields the same canonical root.

use crate::hashing::{double_sha256, sha256, Hash};

/// Compute the canonical Merkle root of `leaves`.
///
/// The empty set hashes to the SHA-256 of the empty string.
pub fn merkle_root(leaves: &[Vec<u8>]) -> Hash {
    if leaves.is_empty() {
        return sha256(&[]);
    }

    let mut level: Vec<Hash> = leaves.iter().map(|leaf| double_sha256(leaf)).collect();
    level.sort_unstable();

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = level[level.len() - 1];
            level.push(last);
        }
        level = level
            .chunks(2)
            .map(|pair| {
                let mut concat = [0u8; 64];
                concat[..32].copy_from_slice(&pair[0]);
                concat[32..].copy_from_slice(&pair[1]);
                sha256(&concat)
            })
            .collect();
    }

    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: usize) -> Vec<Vec<u8>> {
        (0..n).map(|i| vec![i as u8; 8]).collect()
    }

    #[test]
    fn test_empty_set_is_defined() {
        assert_eq!(merkle_root(&[]), sha256(&[]));
    }

    #[test]
    fn test_single_leaf_is_its_double_hash() {
        let root = merkle_root(&[vec![0xAB]]);
        assert_eq!(root, double_sha256(&[0xAB]));
    }

    #[test]
    fn test_order_independent() {
        let forward = leaves(5);
        let mut reversed = forward.clone();
        reversed.reverse();
        assert_eq!(merkle_root(&forward), merkle_root(&reversed));
    }

    #[test]
    fn test_odd_level_duplicates_last() {
        // Three leaves fold as [(a,b), (c,c)]; just assert determinism and
        // sensitivity to the third leaf.
        let three = merkle_root(&leaves(3));
        let mut changed = leaves(3);
        changed[2] = vec![0xFF; 8];
        assert_ne!(three, merkle_root(&changed));
    }

    #[test]
    fn test_different_sets_differ() {
        assert_ne!(merkle_root(&leaves(4)), merkle_root(&leaves(5)));
    }
}
