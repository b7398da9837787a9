//! BLS12-381 Signatures
//!
//! Validator endorsement primitives:
//! - Key generation and sign/verify
//! - Signature and public key aggregation
//!
//! Aggregation is associative and order-independent; the aggregate of a
//! single signature equals that signature. Sub-block endorsement quorums
//! verify one aggregate pairing instead of N.

use blst::min_pk::{AggregatePublicKey, AggregateSignature, PublicKey, SecretKey, Signature};
use blst::BLST_ERROR;
use rand::RngCore;
use zeroize::Zeroize;

use crate::CryptoError;

/// Domain separation tag for Synnergy validator endorsements.
const DST: &[u8] = b"SYNNERGY_POS_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// BLS public key (48 bytes compressed).
#[derive(Clone, Debug)]
pub struct BlsPublicKey(PublicKey);

impl PartialEq for BlsPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BlsPublicKey {}

/// BLS signature (96 bytes).
#[derive(Clone, Debug)]
pub struct BlsSignature(Signature);

impl PartialEq for BlsSignature {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BlsSignature {}

/// BLS key pair for validator role keys.
pub struct BlsKeyPair {
    secret: SecretKey,
    public: BlsPublicKey,
}

impl BlsKeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let mut ikm = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut ikm);
        let secret = SecretKey::key_gen(&ikm, &[]).expect("valid IKM");
        ikm.zeroize();
        let public = BlsPublicKey(secret.sk_to_pk());
        Self { secret, public }
    }

    /// Create from existing secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let public = BlsPublicKey(secret.sk_to_pk());
        Ok(Self { secret, public })
    }

    /// Sign a message (typically a sub-block header hash).
    pub fn sign(&self, message: &[u8]) -> BlsSignature {
        BlsSignature(self.secret.sign(message, DST, &[]))
    }

    /// Get the public key.
    pub fn public_key(&self) -> BlsPublicKey {
        self.public.clone()
    }

    /// Get the secret key bytes.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }
}

impl BlsPublicKey {
    /// Verify a signature against this public key.
    pub fn verify(&self, message: &[u8], signature: &BlsSignature) -> bool {
        signature.0.verify(true, message, DST, &[], &self.0, true) == BLST_ERROR::BLST_SUCCESS
    }

    /// Create from 48-byte compressed representation.
    pub fn from_bytes(bytes: &[u8; 48]) -> Result<Self, CryptoError> {
        PublicKey::from_bytes(bytes)
            .map(BlsPublicKey)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Serialize to 48-byte compressed form.
    pub fn to_bytes(&self) -> [u8; 48] {
        self.0.to_bytes()
    }

    /// Aggregate multiple public keys into one.
    pub fn aggregate(keys: &[BlsPublicKey]) -> Result<Self, CryptoError> {
        if keys.is_empty() {
            return Err(CryptoError::InvalidInput("empty key list".into()));
        }
        let refs: Vec<&PublicKey> = keys.iter().map(|k| &k.0).collect();
        AggregatePublicKey::aggregate(&refs, true)
            .map(|apk| BlsPublicKey(apk.to_public_key()))
            .map_err(|_| CryptoError::AggregationFailed)
    }
}

impl BlsSignature {
    /// Create from 96-byte representation.
    pub fn from_bytes(bytes: &[u8; 96]) -> Result<Self, CryptoError> {
        Signature::from_bytes(bytes)
            .map(BlsSignature)
            .map_err(|_| CryptoError::InvalidSignatureFormat)
    }

    /// Serialize to 96-byte form.
    pub fn to_bytes(&self) -> [u8; 96] {
        self.0.to_bytes()
    }

    /// Aggregate multiple signatures over the same message into one.
    pub fn aggregate(sigs: &[BlsSignature]) -> Result<Self, CryptoError> {
        if sigs.is_empty() {
            return Err(CryptoError::InvalidInput("empty signature list".into()));
        }
        let refs: Vec<&Signature> = sigs.iter().map(|s| &s.0).collect();
        AggregateSignature::aggregate(&refs, true)
            .map(|asig| BlsSignature(asig.to_signature()))
            .map_err(|_| CryptoError::AggregationFailed)
    }
}

/// Verify an aggregate signature against an aggregate public key.
///
/// Holds exactly when every constituent signature verifies under its
/// constituent key over the same `message`.
pub fn verify_aggregate(
    agg_sig: &BlsSignature,
    agg_pub: &BlsPublicKey,
    message: &[u8],
) -> bool {
    agg_pub.verify(message, agg_sig)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let keypair = BlsKeyPair::generate();
        let message = b"sub-block header hash";
        let signature = keypair.sign(message);
        assert!(keypair.public_key().verify(message, &signature));
    }

    #[test]
    fn test_wrong_message_rejected() {
        let keypair = BlsKeyPair::generate();
        let signature = keypair.sign(b"endorse h1");
        assert!(!keypair.public_key().verify(b"endorse h2", &signature));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let kp1 = BlsKeyPair::generate();
        let kp2 = BlsKeyPair::generate();
        let signature = kp1.sign(b"message");
        assert!(!kp2.public_key().verify(b"message", &signature));
    }

    #[test]
    fn test_aggregate_of_one_equals_itself() {
        let keypair = BlsKeyPair::generate();
        let sig = keypair.sign(b"message");
        let agg = BlsSignature::aggregate(std::slice::from_ref(&sig)).unwrap();
        assert_eq!(agg, sig);
    }

    #[test]
    fn test_aggregate_order_independent() {
        let kp1 = BlsKeyPair::generate();
        let kp2 = BlsKeyPair::generate();
        let message = b"same message";

        let s1 = kp1.sign(message);
        let s2 = kp2.sign(message);

        let forward = BlsSignature::aggregate(&[s1.clone(), s2.clone()]).unwrap();
        let reverse = BlsSignature::aggregate(&[s2, s1]).unwrap();
        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_verify_aggregate_quorum() {
        let keypairs: Vec<BlsKeyPair> = (0..4).map(|_| BlsKeyPair::generate()).collect();
        let message = b"header hash";

        let sigs: Vec<BlsSignature> = keypairs.iter().map(|kp| kp.sign(message)).collect();
        let pubs: Vec<BlsPublicKey> = keypairs.iter().map(|kp| kp.public_key()).collect();

        let agg_sig = BlsSignature::aggregate(&sigs).unwrap();
        let agg_pub = BlsPublicKey::aggregate(&pubs).unwrap();

        assert!(verify_aggregate(&agg_sig, &agg_pub, message));
        assert!(!verify_aggregate(&agg_sig, &agg_pub, b"other"));
    }

    #[test]
    fn test_aggregate_empty_fails() {
        assert!(BlsSignature::aggregate(&[]).is_err());
        assert!(BlsPublicKey::aggregate(&[]).is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let keypair = BlsKeyPair::generate();
        let signature = keypair.sign(b"message");

        let pk = BlsPublicKey::from_bytes(&keypair.public_key().to_bytes()).unwrap();
        let sig = BlsSignature::from_bytes(&signature.to_bytes()).unwrap();
        assert!(pk.verify(b"message", &sig));
    }

    #[test]
    fn test_from_secret_bytes_deterministic() {
        let kp1 = BlsKeyPair::generate();
        let kp2 = BlsKeyPair::from_secret_bytes(&kp1.secret_bytes()).unwrap();
        assert_eq!(kp1.public_key(), kp2.public_key());
        assert_eq!(kp1.sign(b"m"), kp2.sign(b"m"));
    }
}
