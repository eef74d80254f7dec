//! Pool account decoding
//!
//! The layout variant is chosen by byte length alone. A length that matches
//! neither variant is reported, never guessed.

use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use crate::errors::{AmmError, AmmResult};
use crate::layout::{Layout, PoolState, SingleFeePool, TieredFeePool};
use crate::types::{LayoutVersion, PoolStatus};

/// Decode raw pool account bytes into the matching layout variant
pub fn decode_pool(data: &[u8]) -> AmmResult<PoolState> {
    match data.len() {
        SingleFeePool::SPAN => SingleFeePool::decode(data).map(PoolState::from),
        TieredFeePool::SPAN => TieredFeePool::decode(data).map(PoolState::from),
        len => Err(AmmError::UnknownLayout { len }),
    }
}

/// Display form of a pool record
///
/// Fee fractions are decimals and addresses are base58 text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolView {
    pub address: Option<String>,
    pub version: LayoutVersion,
    pub status: PoolStatus,
    pub nonce: u8,
    pub k_a: u64,
    pub k_b: u64,
    pub tolerance: u64,
    pub fees: Vec<f64>,
    pub total_fee: f64,
    pub owner: String,
    pub mint_a: String,
    pub mint_b: String,
    pub vault_a: String,
    pub vault_b: String,
    pub fee_vault: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fee_receivers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_mint: Option<String>,
}

impl PoolView {
    pub fn from_state(state: &PoolState) -> Self {
        let fees = state.fees().as_fractions();
        let total_fee = fees.iter().sum();
        let fee_mint = match state {
            PoolState::SingleFee(_) => None,
            PoolState::TieredFee(pool) => Some(pool.fee_mint.to_string()),
        };

        Self {
            address: None,
            version: state.version(),
            status: state.status(),
            nonce: state.nonce(),
            k_a: state.k_a(),
            k_b: state.k_b(),
            tolerance: state.tolerance(),
            fees,
            total_fee,
            owner: state.owner().to_string(),
            mint_a: state.mint_a().to_string(),
            mint_b: state.mint_b().to_string(),
            vault_a: state.vault_a().to_string(),
            vault_b: state.vault_b().to_string(),
            fee_vault: state.fee_vault().to_string(),
            fee_receivers: state.fee_receivers().iter().map(Pubkey::to_string).collect(),
            fee_mint,
        }
    }

    pub fn with_address(mut self, address: &Pubkey) -> Self {
        self.address = Some(address.to_string());
        self
    }
}

/// Decode straight to the display form
pub fn decode_pool_view(data: &[u8]) -> AmmResult<PoolView> {
    decode_pool(data).map(|state| PoolView::from_state(&state))
}
