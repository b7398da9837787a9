//! Node configuration.
//!
//! One JSON document selects the ledger paths and intervals, the network
//! surface, and the consensus cadence. Fatal inconsistencies (zero
//! treasury, zero difficulty) are rejected before any service starts.

use crate::errors::NodeError;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use shared_types::Address;
use std::path::{Path, PathBuf};

/// Network surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Listen address (host:port).
    pub listen_addr: String,
    /// Peers dialled at startup.
    pub bootstrap_peers: Vec<String>,
    /// Discovery tag peers rendezvous on.
    pub discovery_tag: String,
    /// Optional TLS certificate chain (DER/PEM path).
    pub tls_cert_path: Option<PathBuf>,
    /// Optional TLS private key path.
    pub tls_key_path: Option<PathBuf>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:30750".into(),
            bootstrap_peers: Vec::new(),
            discovery_tag: "synnergy/mainnet".into(),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

/// Full node configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Directory holding WAL, snapshot and archive.
    pub data_dir: PathBuf,
    /// Chain identifier exposed to the VM.
    pub chain_id: u64,
    /// Treasury account (hex, 20 bytes). Must not be zero.
    pub treasury: String,
    /// Initial difficulty as leading zero bits of the target ceiling
    /// (`target = U256::MAX >> bits`). Must leave a positive target.
    pub initial_difficulty_bits: u32,
    /// Blocks between snapshots.
    pub snapshot_interval: u64,
    /// Recent blocks kept unpruned.
    pub prune_interval: u64,
    /// Seconds between sub-block proposals.
    pub sub_block_interval_secs: u64,
    /// Seconds between main-block seal attempts.
    pub main_block_interval_secs: u64,
    /// Network surface.
    pub network: NetworkConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./synnergy-data"),
            chain_id: 1,
            treasury: hex::encode([0x11u8; 20]),
            initial_difficulty_bits: 20,
            snapshot_interval: 128,
            prune_interval: 1_024,
            sub_block_interval_secs: 30,
            main_block_interval_secs: 900,
            network: NetworkConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let bytes = std::fs::read(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_slice(&bytes).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// The treasury address, validated non-zero.
    pub fn treasury_address(&self) -> Result<Address, NodeError> {
        let bytes = hex::decode(self.treasury.trim_start_matches("0x"))
            .map_err(|e| NodeError::Config(format!("treasury: {e}")))?;
        let raw: [u8; 20] = bytes
            .try_into()
            .map_err(|_| NodeError::Config("treasury must be 20 bytes".into()))?;
        let address = Address(raw);
        if address.is_zero() {
            return Err(NodeError::InvalidTreasury);
        }
        Ok(address)
    }

    /// The initial PoW target, validated positive.
    pub fn initial_difficulty(&self) -> Result<U256, NodeError> {
        if self.initial_difficulty_bits >= 256 {
            return Err(NodeError::InvalidDifficulty(self.initial_difficulty_bits));
        }
        Ok(U256::MAX >> self.initial_difficulty_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrips_through_json() {
        let config = NodeConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: NodeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chain_id, config.chain_id);
        assert_eq!(back.network.discovery_tag, config.network.discovery_tag);
    }

    #[test]
    fn test_zero_treasury_rejected() {
        let config = NodeConfig {
            treasury: hex::encode([0u8; 20]),
            ..Default::default()
        };
        assert!(matches!(
            config.treasury_address(),
            Err(NodeError::InvalidTreasury)
        ));
    }

    #[test]
    fn test_difficulty_bits_bounded() {
        let config = NodeConfig {
            initial_difficulty_bits: 256,
            ..Default::default()
        };
        assert!(matches!(
            config.initial_difficulty(),
            Err(NodeError::InvalidDifficulty(256))
        ));
    }

    #[test]
    fn test_treasury_accepts_0x_prefix() {
        let config = NodeConfig {
            treasury: format!("0x{}", hex::encode([0x22u8; 20])),
            ..Default::default()
        };
        assert_eq!(config.treasury_address().unwrap(), Address([0x22u8; 20]));
    }
}
