//! Pool discovery filters
//!
//! Program-account queries are narrowed by data size, which selects the
//! layout variant, and by byte comparisons at the owner and mint offsets of
//! that variant.

use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use crate::layout::{offsets, SINGLE_FEE_POOL_LEN, TIERED_FEE_POOL_LEN};
use crate::types::LayoutVersion;

/// A single server-side account filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountFilter {
    DataSize(u64),
    Memcmp {
        offset: usize,
        #[serde(serialize_with = "serialize_base58")]
        bytes: Vec<u8>,
    },
}

/// Criteria for finding pools of one layout variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolFilter {
    pub version: LayoutVersion,
    pub owner: Option<Pubkey>,
    pub mint_a: Option<Pubkey>,
    pub mint_b: Option<Pubkey>,
}

impl PoolFilter {
    /// Every pool of the given variant
    pub fn all(version: LayoutVersion) -> Self {
        Self {
            version,
            owner: None,
            mint_a: None,
            mint_b: None,
        }
    }

    pub fn by_owner(version: LayoutVersion, owner: Pubkey) -> Self {
        Self {
            owner: Some(owner),
            ..Self::all(version)
        }
    }

    pub fn by_mints(version: LayoutVersion, mint_a: Pubkey, mint_b: Pubkey) -> Self {
        Self {
            mint_a: Some(mint_a),
            mint_b: Some(mint_b),
            ..Self::all(version)
        }
    }

    pub fn data_size(&self) -> usize {
        match self.version {
            LayoutVersion::SingleFee => SINGLE_FEE_POOL_LEN,
            LayoutVersion::TieredFee => TIERED_FEE_POOL_LEN,
        }
    }

    /// Offset of the owner address; the mints follow it directly
    pub fn owner_offset(&self) -> usize {
        match self.version {
            LayoutVersion::SingleFee => offsets::SINGLE_FEE_OWNER,
            LayoutVersion::TieredFee => offsets::TIERED_FEE_OWNER,
        }
    }

    pub fn account_filters(&self) -> Vec<AccountFilter> {
        let owner_offset = self.owner_offset();
        let mut filters = vec![AccountFilter::DataSize(self.data_size() as u64)];

        let fields = [
            (self.owner, owner_offset),
            (self.mint_a, owner_offset + 32),
            (self.mint_b, owner_offset + 64),
        ];
        for (key, offset) in fields {
            if let Some(key) = key {
                filters.push(AccountFilter::Memcmp {
                    offset,
                    bytes: key.to_bytes().to_vec(),
                });
            }
        }

        filters
    }
}

fn serialize_base58<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&bs58::encode(bytes).into_string())
}
