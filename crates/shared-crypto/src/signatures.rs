//! Algorithm-dispatched sign/verify.
//!
//! Keys and signatures are opaque byte strings with fixed sizes per
//! algorithm; size mismatches surface as distinct error kinds before any
//! curve arithmetic runs.

use crate::bls::{BlsKeyPair, BlsPublicKey, BlsSignature};
use crate::dilithium::{DilithiumPublicKey, DilithiumSignature};
use crate::ecdsa::{Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature};
use crate::CryptoError;
use shared_types::SignatureAlgo;

/// Secret key length for the fixed-size algorithms.
const SEED_LEN: usize = 32;
/// Compressed secp256k1 public key length.
const SECP_PUB_LEN: usize = 33;
/// secp256k1 signature length (r||s).
const SECP_SIG_LEN: usize = 64;
/// Compressed BLS public key length.
const BLS_PUB_LEN: usize = 48;
/// BLS signature length.
const BLS_SIG_LEN: usize = 96;

fn expect_len(bytes: &[u8], expected: usize) -> Result<(), CryptoError> {
    if bytes.len() != expected {
        return Err(CryptoError::InvalidKeyLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Sign `message` with a private key under the selected algorithm.
///
/// # Errors
///
/// - `InvalidKeyLength` when the key size does not match the algorithm
/// - `InvalidPrivateKey` when the bytes are not a valid key
pub fn sign(algo: SignatureAlgo, private_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match algo {
        SignatureAlgo::Secp256k1 => {
            expect_len(private_key, SEED_LEN)?;
            let mut seed = [0u8; SEED_LEN];
            seed.copy_from_slice(private_key);
            let keypair = Secp256k1KeyPair::from_bytes(seed)?;
            Ok(keypair.sign(message).as_bytes().to_vec())
        }
        SignatureAlgo::Bls => {
            expect_len(private_key, SEED_LEN)?;
            let mut seed = [0u8; SEED_LEN];
            seed.copy_from_slice(private_key);
            let keypair = BlsKeyPair::from_secret_bytes(&seed)?;
            Ok(keypair.sign(message).to_bytes().to_vec())
        }
        SignatureAlgo::Dilithium => {
            // Dilithium secret keys are structured; the scheme's own
            // decoder validates the length.
            let sig = crate::dilithium::sign_with_secret(private_key, message)?;
            Ok(sig.to_bytes())
        }
    }
}

/// Verify `signature` over `message` under the selected algorithm.
///
/// Returns `Ok(false)` for a well-formed signature that does not verify,
/// and an error for malformed keys or signatures.
///
/// # Errors
///
/// - `InvalidKeyLength` / `InvalidPublicKey` for bad keys
/// - `InvalidSignatureFormat` for wrong-size signature bytes
pub fn verify(
    algo: SignatureAlgo,
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<bool, CryptoError> {
    match algo {
        SignatureAlgo::Secp256k1 => {
            expect_len(public_key, SECP_PUB_LEN)?;
            if signature.len() != SECP_SIG_LEN {
                return Err(CryptoError::InvalidSignatureFormat);
            }
            let mut pk = [0u8; SECP_PUB_LEN];
            pk.copy_from_slice(public_key);
            let mut sig = [0u8; SECP_SIG_LEN];
            sig.copy_from_slice(signature);
            let public = Secp256k1PublicKey::from_bytes(pk)?;
            match public.verify(message, &Secp256k1Signature::from_bytes(sig)) {
                Ok(()) => Ok(true),
                Err(CryptoError::SignatureVerificationFailed) => Ok(false),
                Err(e) => Err(e),
            }
        }
        SignatureAlgo::Bls => {
            expect_len(public_key, BLS_PUB_LEN)?;
            if signature.len() != BLS_SIG_LEN {
                return Err(CryptoError::InvalidSignatureFormat);
            }
            let mut pk = [0u8; BLS_PUB_LEN];
            pk.copy_from_slice(public_key);
            let mut sig = [0u8; BLS_SIG_LEN];
            sig.copy_from_slice(signature);
            let public = BlsPublicKey::from_bytes(&pk)?;
            let signature = BlsSignature::from_bytes(&sig)?;
            Ok(public.verify(message, &signature))
        }
        SignatureAlgo::Dilithium => {
            let public = DilithiumPublicKey::from_bytes(public_key)?;
            let signature = DilithiumSignature::from_bytes(signature)?;
            Ok(public.verify(message, &signature))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secp256k1_dispatch_roundtrip() {
        let keypair = Secp256k1KeyPair::from_bytes([0x11u8; 32]).unwrap();
        let sig = sign(SignatureAlgo::Secp256k1, &[0x11u8; 32], b"msg").unwrap();
        let ok = verify(
            SignatureAlgo::Secp256k1,
            keypair.public_key().as_bytes(),
            b"msg",
            &sig,
        )
        .unwrap();
        assert!(ok);
    }

    #[test]
    fn test_bls_dispatch_roundtrip() {
        let keypair = BlsKeyPair::generate();
        let seed = keypair.secret_bytes();
        let sig = sign(SignatureAlgo::Bls, &seed, b"msg").unwrap();
        let ok = verify(
            SignatureAlgo::Bls,
            &keypair.public_key().to_bytes(),
            b"msg",
            &sig,
        )
        .unwrap();
        assert!(ok);
    }

    #[test]
    fn test_dilithium_dispatch_roundtrip() {
        let keypair = crate::dilithium::DilithiumKeyPair::generate();
        let sig = sign(SignatureAlgo::Dilithium, &keypair.secret_bytes(), b"msg").unwrap();
        let ok = verify(
            SignatureAlgo::Dilithium,
            &keypair.public_key().to_bytes(),
            b"msg",
            &sig,
        )
        .unwrap();
        assert!(ok);
    }

    #[test]
    fn test_wrong_key_size_reports_lengths() {
        let err = sign(SignatureAlgo::Bls, &[0u8; 16], b"msg").unwrap_err();
        assert_eq!(
            err,
            CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            }
        );
    }

    #[test]
    fn test_wrong_signature_size_is_format_error() {
        let keypair = BlsKeyPair::generate();
        let err = verify(
            SignatureAlgo::Bls,
            &keypair.public_key().to_bytes(),
            b"msg",
            &[0u8; 12],
        )
        .unwrap_err();
        assert_eq!(err, CryptoError::InvalidSignatureFormat);
    }

    #[test]
    fn test_bad_signature_verifies_false() {
        let kp1 = Secp256k1KeyPair::from_bytes([0x22u8; 32]).unwrap();
        let sig = sign(SignatureAlgo::Secp256k1, &[0x33u8; 32], b"msg").unwrap();
        let ok = verify(
            SignatureAlgo::Secp256k1,
            kp1.public_key().as_bytes(),
            b"msg",
            &sig,
        )
        .unwrap();
        assert!(!ok);
    }
}
