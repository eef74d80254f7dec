//! Test Utilities Module
//!
//! In-memory collaborators and pool fixtures for deterministic tests of the
//! orchestrator and client workflows. Nothing here touches the network.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    program_pack::Pack,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
use spl_associated_token_account::get_associated_token_address_with_program_id;
use spl_token::state::{Account as TokenAccount, AccountState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::address::{find_pool_authority, pool_authority};
use crate::config::ProgramIds;
use crate::errors::{AmmError, AmmResult};
use crate::filters::AccountFilter;
use crate::layout::{PoolState, SingleFeePool, TieredFeePool};
use crate::orchestrator::{AccountSource, LedgerGateway, SignerService, SubmitFailure};
use crate::types::{PoolStatus, FEE_TIERS};
use crate::wallet::WalletManager;

/// Mock ledger that records every submitted transaction
///
/// Succeeds by default with a deterministic signature.
#[derive(Clone)]
pub struct MockLedger {
    pub blockhash: Hash,
    pub fail_blockhash: Arc<Mutex<bool>>,
    pub rejection: Arc<Mutex<Option<SubmitFailure>>>,
    pub submitted: Arc<Mutex<Vec<Transaction>>>,
    pub mock_signature: Signature,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            blockhash: Hash::new_unique(),
            fail_blockhash: Arc::new(Mutex::new(false)),
            rejection: Arc::new(Mutex::new(None)),
            submitted: Arc::new(Mutex::new(Vec::new())),
            mock_signature: Signature::from([7u8; 64]),
        }
    }

    /// Make blockhash retrieval fail
    pub async fn set_fail_blockhash(&self, fail: bool) {
        *self.fail_blockhash.lock().await = fail;
    }

    /// Make the next submissions fail with `failure`
    pub async fn reject_with(&self, failure: SubmitFailure) {
        *self.rejection.lock().await = Some(failure);
    }

    pub async fn submissions(&self) -> Vec<Transaction> {
        self.submitted.lock().await.clone()
    }

    pub async fn submission_count(&self) -> usize {
        self.submitted.lock().await.len()
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerGateway for MockLedger {
    async fn latest_blockhash(&self) -> AmmResult<Hash> {
        if *self.fail_blockhash.lock().await {
            return Err(AmmError::upstream("blockhash", "mock ledger unavailable"));
        }
        Ok(self.blockhash)
    }

    async fn submit(&self, tx: &Transaction) -> Result<Signature, SubmitFailure> {
        self.submitted.lock().await.push(tx.clone());
        match self.rejection.lock().await.clone() {
            Some(failure) => Err(failure),
            None => Ok(self.mock_signature),
        }
    }
}

/// Signer that can be switched to fail
#[derive(Clone)]
pub struct MockSigner {
    pub wallet: WalletManager,
    pub should_fail: bool,
}

impl MockSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            wallet: WalletManager::from_keypair(keypair),
            should_fail: false,
        }
    }

    pub fn new_failing(keypair: Keypair) -> Self {
        Self {
            should_fail: true,
            ..Self::new(keypair)
        }
    }
}

#[async_trait]
impl SignerService for MockSigner {
    fn pubkey(&self) -> Pubkey {
        self.wallet.pubkey()
    }

    async fn sign_transaction(&self, tx: &mut Transaction) -> AmmResult<()> {
        if self.should_fail {
            return Err(AmmError::upstream("sign", "mock signer refused"));
        }
        self.wallet.sign_transaction(tx).await
    }
}

/// In-memory account store
#[derive(Debug, Clone, Default)]
pub struct MockAccounts {
    pub owners: HashMap<Pubkey, Pubkey>,
    pub data: HashMap<Pubkey, Vec<u8>>,
    pub balances: HashMap<Pubkey, u64>,
    pub decimals: HashMap<Pubkey, u8>,
    pub rent_per_byte: u64,
}

impl MockAccounts {
    pub fn new() -> Self {
        Self {
            rent_per_byte: 10,
            ..Default::default()
        }
    }

    /// Account owned by `program` holding `data`
    pub fn with_account(mut self, address: Pubkey, program: Pubkey, data: Vec<u8>) -> Self {
        self.owners.insert(address, program);
        self.data.insert(address, data);
        self
    }

    /// Encoded pool account owned by the AMM program
    pub fn with_pool(self, ids: &ProgramIds, address: Pubkey, state: &PoolState) -> Self {
        let data = state.encode().expect("fixture pool encodes");
        self.with_account(address, ids.amm, data)
    }

    /// Initialized token account of `mint` held by `holder`
    pub fn with_token_account(
        mut self,
        ids: &ProgramIds,
        address: Pubkey,
        mint: Pubkey,
        holder: Pubkey,
        amount: u64,
    ) -> Self {
        let account = TokenAccount {
            mint,
            owner: holder,
            amount,
            state: AccountState::Initialized,
            ..Default::default()
        };
        let mut data = vec![0u8; TokenAccount::LEN];
        TokenAccount::pack(account, &mut data).expect("token account packs");
        self.balances.insert(address, amount);
        self.with_account(address, ids.token, data)
    }

    /// Associated token account of `wallet` for `mint`
    pub fn with_ata(self, ids: &ProgramIds, wallet: &Pubkey, mint: &Pubkey, amount: u64) -> Self {
        let ata = get_associated_token_address_with_program_id(wallet, mint, &ids.token);
        self.with_token_account(ids, ata, *mint, *wallet, amount)
    }

    /// Encoded pool plus both vaults, held by the authority its nonce derives
    pub fn with_pool_and_vaults(
        self,
        ids: &ProgramIds,
        address: Pubkey,
        state: &PoolState,
        reserves: (u64, u64),
    ) -> Self {
        let authority =
            pool_authority(&address, state.nonce(), &ids.amm).expect("fixture nonce is valid");
        self.with_pool(ids, address, state)
            .with_token_account(ids, state.vault_a(), state.mint_a(), authority, reserves.0)
            .with_token_account(ids, state.vault_b(), state.mint_b(), authority, reserves.1)
    }

    pub fn with_mint(mut self, mint: Pubkey, decimals: u8) -> Self {
        self.decimals.insert(mint, decimals);
        self
    }
}

#[async_trait]
impl AccountSource for MockAccounts {
    async fn account_data(&self, address: &Pubkey) -> AmmResult<Option<Vec<u8>>> {
        Ok(self.data.get(address).cloned())
    }

    async fn token_balance(&self, token_account: &Pubkey) -> AmmResult<u64> {
        self.balances
            .get(token_account)
            .copied()
            .ok_or_else(|| AmmError::upstream("token_balance", format!("{token_account} not found")))
    }

    async fn mint_decimals(&self, mint: &Pubkey) -> AmmResult<u8> {
        self.decimals
            .get(mint)
            .copied()
            .ok_or_else(|| AmmError::upstream("mint_decimals", format!("mint {mint} not found")))
    }

    async fn rent_exempt_minimum(&self, data_len: usize) -> AmmResult<u64> {
        Ok(data_len as u64 * self.rent_per_byte)
    }

    async fn program_accounts(
        &self,
        program: &Pubkey,
        filters: &[AccountFilter],
    ) -> AmmResult<Vec<(Pubkey, Vec<u8>)>> {
        let mut found: Vec<(Pubkey, Vec<u8>)> = self
            .data
            .iter()
            .filter(|(address, _)| self.owners.get(*address) == Some(program))
            .filter(|(_, data)| filters.iter().all(|f| filter_matches(f, data)))
            .map(|(address, data)| (*address, data.clone()))
            .collect();
        found.sort_by_key(|(address, _)| *address);
        Ok(found)
    }
}

fn filter_matches(filter: &AccountFilter, data: &[u8]) -> bool {
    match filter {
        AccountFilter::DataSize(len) => data.len() as u64 == *len,
        AccountFilter::Memcmp { offset, bytes } => data
            .get(*offset..offset + bytes.len())
            .is_some_and(|window| window == bytes.as_slice()),
    }
}

/// Program ids with a fresh AMM program id
pub fn test_program_ids() -> ProgramIds {
    ProgramIds::new(Pubkey::new_unique())
}

/// Pool address and an active single-fee pool whose nonce is valid for it
///
/// Baseline k = 1_000 * 2_000 with zero fee and tolerance 1_000.
pub fn single_fee_fixture(ids: &ProgramIds, owner: Pubkey) -> (Pubkey, PoolState) {
    let pool = Pubkey::new_unique();
    let (_, nonce) = find_pool_authority(&pool, &ids.amm).expect("authority exists");
    let state = PoolState::SingleFee(SingleFeePool {
        status: PoolStatus::Active,
        nonce,
        k_a: 1_000,
        k_b: 2_000,
        tolerance: 1_000,
        fee: 0,
        owner,
        mint_a: Pubkey::new_unique(),
        mint_b: Pubkey::new_unique(),
        vault_a: Pubkey::new_unique(),
        vault_b: Pubkey::new_unique(),
        fee_vault: Pubkey::new_unique(),
    });
    (pool, state)
}

/// Pool address and an active five-tier pool with distinct receivers
pub fn tiered_fee_fixture(ids: &ProgramIds, owner: Pubkey) -> (Pubkey, PoolState) {
    let pool = Pubkey::new_unique();
    let (_, nonce) = find_pool_authority(&pool, &ids.amm).expect("authority exists");
    let state = PoolState::TieredFee(TieredFeePool {
        status: PoolStatus::Active,
        nonce,
        k_a: 1_000,
        k_b: 2_000,
        tolerance: 1_000,
        fees: [500, 400, 300, 200, 100],
        owner,
        mint_a: Pubkey::new_unique(),
        mint_b: Pubkey::new_unique(),
        vault_a: Pubkey::new_unique(),
        vault_b: Pubkey::new_unique(),
        fee_vault: Pubkey::new_unique(),
        fee_receivers: std::array::from_fn::<_, FEE_TIERS, _>(|_| Pubkey::new_unique()),
        fee_mint: Pubkey::new_unique(),
    });
    (pool, state)
}

/// Accounts holding `state` at `pool` with vault reserves 1_000 / 2_000
pub fn accounts_with_pool(ids: &ProgramIds, pool: Pubkey, state: &PoolState) -> MockAccounts {
    MockAccounts::new().with_pool_and_vaults(ids, pool, state, (1_000, 2_000))
}

