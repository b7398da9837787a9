//! # Synnergy Node Runtime
//!
//! Startup wiring: configuration, genesis, the `Services` container and
//! fatal-error handling. The binary in `main.rs` is a thin shell around
//! these pieces.

#![warn(clippy::all)]

pub mod config;
pub mod errors;
pub mod genesis;
pub mod services;

// Re-exports
pub use config::{NetworkConfig, NodeConfig};
pub use errors::NodeError;
pub use genesis::GenesisBuilder;
pub use services::Services;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
