//! Constant-product AMM client library
//!
//! Encodes and decodes the AMM program's pool accounts and instructions,
//! derives its addresses, quotes swaps with exact integer math and submits
//! built transactions through pluggable ledger collaborators.
//!
//! Layering, leaves first: `layout` / `address` / `quote` → `decoder` /
//! `tx_builder` → `orchestrator` → `client`.

pub mod address;
pub mod amount;
pub mod client;
pub mod config;
pub mod decoder;
pub mod errors;
pub mod filters;
pub mod layout;
pub mod metrics;
pub mod observability;
pub mod orchestrator;
pub mod quote;
pub mod rpc;
pub mod structured_logging;
pub mod tx_builder;
pub mod types;
pub mod wallet;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

// Re-export commonly used types
pub use client::AmmClient;
pub use config::{Config, ProgramIds};
pub use errors::{AmmError, AmmResult};
pub use layout::PoolState;
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
pub use types::{Direction, FeeSchedule, LayoutVersion, PoolStatus};

#[cfg(test)]
mod tests {
    mod client_tests;
    mod codec_roundtrip_tests;
    mod config_validation;
    mod instruction_ordering_tests;
    mod orchestrator_tests;
}
