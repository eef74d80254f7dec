//! Pool account layouts
//!
//! Two versions of the pool account exist on the ledger. Both start with the
//! same header (status, nonce, invariant baseline, tolerance) and differ in the
//! fee block and the trailing receiver addresses.

use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_sdk::pubkey::Pubkey;

use super::{check_fee, check_span, Layout};
use crate::errors::AmmResult;
use crate::types::{FeeSchedule, LayoutVersion, PoolStatus, FEE_TIERS};

/// status(1) nonce(1) k_a(8) k_b(8) tolerance(8) fee(8) + 6 addresses
pub const SINGLE_FEE_POOL_LEN: usize = 1 + 1 + 8 * 3 + 8 + 32 * 6;

/// status(1) nonce(1) k_a(8) k_b(8) tolerance(8) fee(8 * 5) + 6 addresses
/// + 5 fee receivers + fee mint
pub const TIERED_FEE_POOL_LEN: usize = 1 + 1 + 8 * 3 + 8 * FEE_TIERS + 32 * 6 + 32 * FEE_TIERS + 32;

/// Byte offsets used by memcmp account filters
pub mod offsets {
    pub const STATUS: usize = 0;
    pub const NONCE: usize = 1;
    pub const K_A: usize = 2;
    pub const K_B: usize = 10;
    pub const TOLERANCE: usize = 18;
    pub const FEES: usize = 26;

    pub const SINGLE_FEE_OWNER: usize = FEES + 8;
    pub const TIERED_FEE_OWNER: usize = FEES + 8 * super::FEE_TIERS;
}

/// Pool account, single-fee version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleFeePool {
    pub status: PoolStatus,
    pub nonce: u8,
    pub k_a: u64,
    pub k_b: u64,
    pub tolerance: u64,
    pub fee: u64,
    pub owner: Pubkey,
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub vault_a: Pubkey,
    pub vault_b: Pubkey,
    pub fee_vault: Pubkey,
}

impl Layout for SingleFeePool {
    const NAME: &'static str = "SingleFeePool";
    const SPAN: usize = SINGLE_FEE_POOL_LEN;

    fn decode(src: &[u8]) -> AmmResult<Self> {
        check_span(Self::NAME, src, Self::SPAN)?;
        let src = array_ref![src, 0, SINGLE_FEE_POOL_LEN];
        let (
            status_buf,
            nonce_buf,
            k_a_buf,
            k_b_buf,
            tolerance_buf,
            fee_buf,
            owner_buf,
            mint_a_buf,
            mint_b_buf,
            vault_a_buf,
            vault_b_buf,
            fee_vault_buf,
        ) = array_refs![src, 1, 1, 8, 8, 8, 8, 32, 32, 32, 32, 32, 32];

        Ok(Self {
            status: PoolStatus::from_u8(status_buf[0])?,
            nonce: nonce_buf[0],
            k_a: u64::from_le_bytes(*k_a_buf),
            k_b: u64::from_le_bytes(*k_b_buf),
            tolerance: u64::from_le_bytes(*tolerance_buf),
            fee: u64::from_le_bytes(*fee_buf),
            owner: Pubkey::new_from_array(*owner_buf),
            mint_a: Pubkey::new_from_array(*mint_a_buf),
            mint_b: Pubkey::new_from_array(*mint_b_buf),
            vault_a: Pubkey::new_from_array(*vault_a_buf),
            vault_b: Pubkey::new_from_array(*vault_b_buf),
            fee_vault: Pubkey::new_from_array(*fee_vault_buf),
        })
    }

    fn encode(&self) -> AmmResult<Vec<u8>> {
        check_fee("fee", self.fee)?;

        let mut buf = vec![0u8; SINGLE_FEE_POOL_LEN];
        let dst = array_mut_ref![buf, 0, SINGLE_FEE_POOL_LEN];
        let (
            status_buf,
            nonce_buf,
            k_a_buf,
            k_b_buf,
            tolerance_buf,
            fee_buf,
            owner_buf,
            mint_a_buf,
            mint_b_buf,
            vault_a_buf,
            vault_b_buf,
            fee_vault_buf,
        ) = mut_array_refs![dst, 1, 1, 8, 8, 8, 8, 32, 32, 32, 32, 32, 32];

        status_buf[0] = self.status.as_u8();
        nonce_buf[0] = self.nonce;
        *k_a_buf = self.k_a.to_le_bytes();
        *k_b_buf = self.k_b.to_le_bytes();
        *tolerance_buf = self.tolerance.to_le_bytes();
        *fee_buf = self.fee.to_le_bytes();
        owner_buf.copy_from_slice(self.owner.as_ref());
        mint_a_buf.copy_from_slice(self.mint_a.as_ref());
        mint_b_buf.copy_from_slice(self.mint_b.as_ref());
        vault_a_buf.copy_from_slice(self.vault_a.as_ref());
        vault_b_buf.copy_from_slice(self.vault_b.as_ref());
        fee_vault_buf.copy_from_slice(self.fee_vault.as_ref());

        Ok(buf)
    }
}

/// Pool account, five-tier fee version with independent receivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TieredFeePool {
    pub status: PoolStatus,
    pub nonce: u8,
    pub k_a: u64,
    pub k_b: u64,
    pub tolerance: u64,
    pub fees: [u64; FEE_TIERS],
    pub owner: Pubkey,
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub vault_a: Pubkey,
    pub vault_b: Pubkey,
    pub fee_vault: Pubkey,
    pub fee_receivers: [Pubkey; FEE_TIERS],
    pub fee_mint: Pubkey,
}

impl Layout for TieredFeePool {
    const NAME: &'static str = "TieredFeePool";
    const SPAN: usize = TIERED_FEE_POOL_LEN;

    fn decode(src: &[u8]) -> AmmResult<Self> {
        check_span(Self::NAME, src, Self::SPAN)?;
        let src = array_ref![src, 0, TIERED_FEE_POOL_LEN];
        let (
            status_buf,
            nonce_buf,
            k_a_buf,
            k_b_buf,
            tolerance_buf,
            fees_buf,
            owner_buf,
            mint_a_buf,
            mint_b_buf,
            vault_a_buf,
            vault_b_buf,
            fee_vault_buf,
            fee_receivers_buf,
            fee_mint_buf,
        ) = array_refs![
            src,
            1,
            1,
            8,
            8,
            8,
            8 * FEE_TIERS,
            32,
            32,
            32,
            32,
            32,
            32,
            32 * FEE_TIERS,
            32
        ];

        let mut fees = [0u64; FEE_TIERS];
        for (src, dst) in fees_buf.chunks_exact(8).zip(fees.iter_mut()) {
            *dst = u64::from_le_bytes(*array_ref![src, 0, 8]);
        }

        let mut fee_receivers = [Pubkey::default(); FEE_TIERS];
        for (src, dst) in fee_receivers_buf.chunks_exact(32).zip(fee_receivers.iter_mut()) {
            *dst = Pubkey::new_from_array(*array_ref![src, 0, 32]);
        }

        Ok(Self {
            status: PoolStatus::from_u8(status_buf[0])?,
            nonce: nonce_buf[0],
            k_a: u64::from_le_bytes(*k_a_buf),
            k_b: u64::from_le_bytes(*k_b_buf),
            tolerance: u64::from_le_bytes(*tolerance_buf),
            fees,
            owner: Pubkey::new_from_array(*owner_buf),
            mint_a: Pubkey::new_from_array(*mint_a_buf),
            mint_b: Pubkey::new_from_array(*mint_b_buf),
            vault_a: Pubkey::new_from_array(*vault_a_buf),
            vault_b: Pubkey::new_from_array(*vault_b_buf),
            fee_vault: Pubkey::new_from_array(*fee_vault_buf),
            fee_receivers,
            fee_mint: Pubkey::new_from_array(*fee_mint_buf),
        })
    }

    fn encode(&self) -> AmmResult<Vec<u8>> {
        for &fee in &self.fees {
            check_fee("fee", fee)?;
        }

        let mut buf = vec![0u8; TIERED_FEE_POOL_LEN];
        let dst = array_mut_ref![buf, 0, TIERED_FEE_POOL_LEN];
        let (
            status_buf,
            nonce_buf,
            k_a_buf,
            k_b_buf,
            tolerance_buf,
            fees_buf,
            owner_buf,
            mint_a_buf,
            mint_b_buf,
            vault_a_buf,
            vault_b_buf,
            fee_vault_buf,
            fee_receivers_buf,
            fee_mint_buf,
        ) = mut_array_refs![
            dst,
            1,
            1,
            8,
            8,
            8,
            8 * FEE_TIERS,
            32,
            32,
            32,
            32,
            32,
            32,
            32 * FEE_TIERS,
            32
        ];

        status_buf[0] = self.status.as_u8();
        nonce_buf[0] = self.nonce;
        *k_a_buf = self.k_a.to_le_bytes();
        *k_b_buf = self.k_b.to_le_bytes();
        *tolerance_buf = self.tolerance.to_le_bytes();
        for (dst, fee) in fees_buf.chunks_exact_mut(8).zip(self.fees.iter()) {
            dst.copy_from_slice(&fee.to_le_bytes());
        }
        owner_buf.copy_from_slice(self.owner.as_ref());
        mint_a_buf.copy_from_slice(self.mint_a.as_ref());
        mint_b_buf.copy_from_slice(self.mint_b.as_ref());
        vault_a_buf.copy_from_slice(self.vault_a.as_ref());
        vault_b_buf.copy_from_slice(self.vault_b.as_ref());
        fee_vault_buf.copy_from_slice(self.fee_vault.as_ref());
        for (dst, receiver) in fee_receivers_buf
            .chunks_exact_mut(32)
            .zip(self.fee_receivers.iter())
        {
            dst.copy_from_slice(receiver.as_ref());
        }
        fee_mint_buf.copy_from_slice(self.fee_mint.as_ref());

        Ok(buf)
    }
}

/// A decoded pool record, tagged by the layout it was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    SingleFee(SingleFeePool),
    TieredFee(TieredFeePool),
}

macro_rules! shared_field {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&self) -> $ty {
                match self {
                    Self::SingleFee(pool) => pool.$name,
                    Self::TieredFee(pool) => pool.$name,
                }
            }
        )*
    };
}

impl PoolState {
    shared_field! {
        status: PoolStatus,
        nonce: u8,
        k_a: u64,
        k_b: u64,
        tolerance: u64,
        owner: Pubkey,
        mint_a: Pubkey,
        mint_b: Pubkey,
        vault_a: Pubkey,
        vault_b: Pubkey,
        fee_vault: Pubkey,
    }

    pub fn version(&self) -> LayoutVersion {
        match self {
            Self::SingleFee(_) => LayoutVersion::SingleFee,
            Self::TieredFee(_) => LayoutVersion::TieredFee,
        }
    }

    pub fn span(&self) -> usize {
        match self {
            Self::SingleFee(_) => SingleFeePool::SPAN,
            Self::TieredFee(_) => TieredFeePool::SPAN,
        }
    }

    pub fn fees(&self) -> FeeSchedule {
        match self {
            Self::SingleFee(pool) => FeeSchedule::Single(pool.fee),
            Self::TieredFee(pool) => FeeSchedule::Tiered(pool.fees),
        }
    }

    /// Reference invariant `k = k_a * k_b` at last settlement
    pub fn invariant(&self) -> u128 {
        self.k_a() as u128 * self.k_b() as u128
    }

    /// Fee receivers of the five-tier layout; empty for the single-fee layout
    pub fn fee_receivers(&self) -> &[Pubkey] {
        match self {
            Self::SingleFee(_) => &[],
            Self::TieredFee(pool) => &pool.fee_receivers,
        }
    }

    /// Mint collected by the fee vault
    ///
    /// The single-fee layout has no explicit fee mint; its fee vault holds
    /// token B.
    pub fn fee_mint(&self) -> Pubkey {
        match self {
            Self::SingleFee(pool) => pool.mint_b,
            Self::TieredFee(pool) => pool.fee_mint,
        }
    }

    pub fn encode(&self) -> AmmResult<Vec<u8>> {
        match self {
            Self::SingleFee(pool) => pool.encode(),
            Self::TieredFee(pool) => pool.encode(),
        }
    }
}

impl From<SingleFeePool> for PoolState {
    fn from(pool: SingleFeePool) -> Self {
        Self::SingleFee(pool)
    }
}

impl From<TieredFeePool> for PoolState {
    fn from(pool: TieredFeePool) -> Self {
        Self::TieredFee(pool)
    }
}
