//! Client workflows
//!
//! Each workflow reads pool state and vault balances fresh from the
//! [`AccountSource`], quotes and builds locally, and hands the resulting plan
//! to the [`Orchestrator`]. Nothing is cached between calls.

use futures::try_join;
use serde::Serialize;
use solana_sdk::{program_pack::Pack, pubkey::Pubkey};
use spl_associated_token_account::get_associated_token_address_with_program_id;
use std::sync::Arc;
use tracing::{debug, info};

use crate::address::{derive_seeded, pool_seed_now, verify_pool_authority, DEFAULT_SEED_PREFIX};
use crate::amount::parse_ui_amount;
use crate::config::ProgramIds;
use crate::decoder::{decode_pool, PoolView};
use crate::errors::{AmmError, AmmResult};
use crate::filters::PoolFilter;
use crate::layout::PoolState;
use crate::metrics::AmmMetrics;
use crate::observability::TraceContext;
use crate::orchestrator::{AccountSource, Orchestrator, SubmissionOutcome};
use crate::quote::{self, Quote, Reserves, SuperSwapQuote, SwapLeg};
use crate::structured_logging::StructuredLogger;
use crate::tx_builder::{
    pool_account_len, CreatePoolParams, InstructionBuilder, SwapParams, TierAccounts,
    TransactionPlan, TOKEN_ACCOUNT_LEN,
};
use crate::types::{Direction, FeeSchedule, PoolStatus};

/// Default invariant tolerance for new pools
pub const DEFAULT_TOLERANCE: u64 = 1000;

/// Pool creation request, deposits in UI units of each mint
#[derive(Debug, Clone)]
pub struct CreatePoolRequest {
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub amount_a: String,
    pub amount_b: String,
    pub fees: FeeSchedule,
    /// Falls back to the client's default tolerance
    pub tolerance: Option<u64>,
    pub tiers: Option<TierAccounts>,
    /// Pool account seed; prefix plus current time when absent
    pub seed: Option<String>,
}

/// Addresses of a created pool and the submission that created it
#[derive(Debug, Clone, Serialize)]
pub struct CreatePoolOutcome {
    #[serde(serialize_with = "serialize_pubkey")]
    pub pool: Pubkey,
    pub seed: String,
    pub nonce: u8,
    #[serde(serialize_with = "serialize_pubkey")]
    pub authority: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub vault_a: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub vault_b: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub fee_vault: Pubkey,
    pub submission: SubmissionOutcome,
}

/// Quote and submission of a swap
#[derive(Debug, Clone, Serialize)]
pub struct SwapOutcome<Q> {
    pub quote: Q,
    pub submission: SubmissionOutcome,
}

/// AMM client bound to one program deployment and one wallet
#[derive(Clone)]
pub struct AmmClient {
    builder: InstructionBuilder,
    accounts: Arc<dyn AccountSource>,
    orchestrator: Orchestrator,
    metrics: Option<AmmMetrics>,
    seed_prefix: String,
    default_tolerance: u64,
}

impl AmmClient {
    pub fn new(ids: ProgramIds, accounts: Arc<dyn AccountSource>, orchestrator: Orchestrator) -> Self {
        Self {
            builder: InstructionBuilder::new(ids),
            accounts,
            orchestrator,
            metrics: None,
            seed_prefix: DEFAULT_SEED_PREFIX.to_string(),
            default_tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_metrics(mut self, metrics: AmmMetrics) -> Self {
        self.orchestrator = self.orchestrator.with_metrics(metrics.clone());
        self.metrics = Some(metrics);
        self
    }

    pub fn with_seed_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.seed_prefix = prefix.into();
        self
    }

    pub fn with_default_tolerance(mut self, tolerance: u64) -> Self {
        self.default_tolerance = tolerance;
        self
    }

    pub fn builder(&self) -> &InstructionBuilder {
        &self.builder
    }

    pub fn program_ids(&self) -> &ProgramIds {
        self.builder.program_ids()
    }

    /// Wallet that signs and pays for every workflow
    pub fn wallet(&self) -> Pubkey {
        self.orchestrator.payer()
    }

    /// Current decoded state of `pool`
    pub async fn fetch_pool(&self, pool: &Pubkey) -> AmmResult<PoolState> {
        fetch_pool(self.accounts.as_ref(), pool).await
    }

    /// Live vault balances of a decoded pool, both read concurrently
    pub async fn fetch_reserves(&self, state: &PoolState) -> AmmResult<Reserves> {
        let vault_a = state.vault_a();
        let vault_b = state.vault_b();
        let (a, b) = try_join!(
            self.accounts.token_balance(&vault_a),
            self.accounts.token_balance(&vault_b)
        )?;
        Ok(Reserves::new(a, b))
    }

    /// Quote a swap against the pool's current reserves
    pub async fn quote_swap(
        &self,
        pool: &Pubkey,
        direction: Direction,
        amount: u64,
    ) -> AmmResult<Quote> {
        let state = self.fetch_pool(pool).await?;
        let reserves = self.fetch_reserves(&state).await?;
        let logger = StructuredLogger::new(&TraceContext::new("quote"));
        self.record_quote(&logger, pool, quote::quote_swap(&state, reserves, direction, amount))
    }

    /// Swap `amount` of token A in `direction`
    ///
    /// `limit` is the minimum token B received for A to B and the maximum
    /// token B paid for B to A. The user's associated token accounts for both
    /// mints must already exist.
    pub async fn swap(
        &self,
        pool: &Pubkey,
        direction: Direction,
        amount: u64,
        limit: Option<u64>,
    ) -> AmmResult<SwapOutcome<Quote>> {
        let trace = TraceContext::new("swap");
        let logger = StructuredLogger::new(&trace);

        let state = self.fetch_pool(pool).await?;
        ensure_active(pool, &state)?;
        let reserves = self.fetch_reserves(&state).await?;
        let quote = self.record_quote(
            &logger,
            pool,
            quote::quote_swap(&state, reserves, direction, amount),
        )?;
        if let Some(limit) = limit {
            quote.enforce_limit(limit).inspect_err(|e| {
                self.reject_quote(&logger, pool, e);
            })?;
        }

        self.verify_vault_authority(pool, &state).await?;

        let user = self.wallet();
        let user_token_a = self.ensure_token_account(&user, &state.mint_a()).await?;
        let user_token_b = self.ensure_token_account(&user, &state.mint_b()).await?;

        let ix = self.builder.swap(
            pool,
            &state,
            &SwapParams {
                user,
                user_token_a,
                user_token_b,
                amount,
                direction,
            },
        )?;
        let submission = self
            .orchestrator
            .execute_traced(TransactionPlan::single(ix), &trace)
            .await?;
        Ok(SwapOutcome { quote, submission })
    }

    /// Swap through two pools in one transaction
    ///
    /// Leg 1 runs in `direction` against `first`; its output must be token A
    /// of `second`, which is then swapped to token B. `min_output` bounds the
    /// final token B received.
    pub async fn super_swap(
        &self,
        first: &Pubkey,
        direction: Direction,
        second: &Pubkey,
        amount: u64,
        min_output: Option<u64>,
    ) -> AmmResult<SwapOutcome<SuperSwapQuote>> {
        let trace = TraceContext::new("super_swap");
        let logger = StructuredLogger::new(&trace);

        let (first_state, second_state) = try_join!(self.fetch_pool(first), self.fetch_pool(second))?;
        ensure_active(first, &first_state)?;
        ensure_active(second, &second_state)?;
        let (first_reserves, second_reserves) = try_join!(
            self.fetch_reserves(&first_state),
            self.fetch_reserves(&second_state)
        )?;

        let route = quote::quote_super_swap(
            SwapLeg {
                pool: &first_state,
                reserves: first_reserves,
            },
            direction,
            SwapLeg {
                pool: &second_state,
                reserves: second_reserves,
            },
            amount,
        )
        .inspect_err(|e| self.reject_quote(&logger, first, e));
        let route = route?;
        self.count_quote(&logger, first, &route.first);
        self.count_quote(&logger, second, &route.second);

        if let Some(limit) = min_output {
            route.second.enforce_limit(limit).inspect_err(|e| {
                self.reject_quote(&logger, second, e);
            })?;
        }

        try_join!(
            self.verify_vault_authority(first, &first_state),
            self.verify_vault_authority(second, &second_state)
        )?;

        let (input_mint, intermediate_mint) = match direction {
            Direction::AToB => (first_state.mint_a(), first_state.mint_b()),
            Direction::BToA => (first_state.mint_b(), first_state.mint_a()),
        };
        let user = self.wallet();
        let user_tokens = [
            self.ensure_token_account(&user, &input_mint).await?,
            self.ensure_token_account(&user, &intermediate_mint).await?,
            self.ensure_token_account(&user, &second_state.mint_b()).await?,
        ];

        let plan = self.builder.super_swap(
            (first, &first_state),
            (second, &second_state),
            &user,
            user_tokens,
            &route,
        )?;
        let submission = self.orchestrator.execute_traced(plan, &trace).await?;
        Ok(SwapOutcome {
            quote: route,
            submission,
        })
    }

    /// Create and fund a new pool owned by the wallet
    pub async fn create_pool(&self, request: &CreatePoolRequest) -> AmmResult<CreatePoolOutcome> {
        let trace = TraceContext::new("create_pool");
        request.fees.validate()?;

        let owner = self.wallet();
        let owner_token_a = self.ensure_token_account(&owner, &request.mint_a).await?;
        let owner_token_b = self.ensure_token_account(&owner, &request.mint_b).await?;

        let (decimals_a, decimals_b, pool_rent, vault_rent) = try_join!(
            self.accounts.mint_decimals(&request.mint_a),
            self.accounts.mint_decimals(&request.mint_b),
            self.accounts
                .rent_exempt_minimum(pool_account_len(request.fees.version())),
            self.accounts.rent_exempt_minimum(TOKEN_ACCOUNT_LEN),
        )?;

        let seed = match &request.seed {
            Some(seed) => seed.clone(),
            None => pool_seed_now(&self.seed_prefix)?,
        };
        let pool = derive_seeded(&owner, &seed, &self.program_ids().amm)?;
        if self.accounts.account_data(&pool).await?.is_some() {
            return Err(AmmError::PoolAlreadyExists(pool.to_string()));
        }

        let params = CreatePoolParams {
            owner,
            seed,
            mint_a: request.mint_a,
            mint_b: request.mint_b,
            owner_token_a,
            owner_token_b,
            fees: request.fees,
            amount_a: parse_ui_amount(&request.amount_a, decimals_a)?,
            amount_b: parse_ui_amount(&request.amount_b, decimals_b)?,
            tolerance: request.tolerance.unwrap_or(self.default_tolerance),
            tiers: request.tiers,
            pool_rent,
            vault_rent,
        };
        let created = self.builder.create_pool(&params)?;
        let submission = self.orchestrator.execute_traced(created.plan, &trace).await?;

        info!(pool = %created.pool, seed = %created.seed, "Pool created");
        Ok(CreatePoolOutcome {
            pool: created.pool,
            seed: created.seed,
            nonce: created.nonce,
            authority: created.authority,
            vault_a: created.vault_a,
            vault_b: created.vault_b,
            fee_vault: created.fee_vault,
            submission,
        })
    }

    pub async fn update_status(
        &self,
        pool: &Pubkey,
        status: PoolStatus,
    ) -> AmmResult<SubmissionOutcome> {
        let state = self.fetch_pool(pool).await?;
        let owner = self.owner_of(&state)?;
        let ix = self.builder.update_status(pool, &owner, status)?;
        self.orchestrator
            .execute_traced(TransactionPlan::single(ix), &TraceContext::new("update_status"))
            .await
    }

    pub async fn update_tolerance(
        &self,
        pool: &Pubkey,
        tolerance: u64,
    ) -> AmmResult<SubmissionOutcome> {
        let state = self.fetch_pool(pool).await?;
        let owner = self.owner_of(&state)?;
        let ix = self.builder.update_tolerance(pool, &owner, tolerance)?;
        self.orchestrator
            .execute_traced(
                TransactionPlan::single(ix),
                &TraceContext::new("update_tolerance"),
            )
            .await
    }

    /// Close the pool, returning vault balances to the owner's token accounts
    pub async fn terminate(&self, pool: &Pubkey) -> AmmResult<SubmissionOutcome> {
        let state = self.fetch_pool(pool).await?;
        let owner = self.owner_of(&state)?;
        self.verify_vault_authority(pool, &state).await?;
        let owner_token_a = self.ensure_token_account(&owner, &state.mint_a()).await?;
        let owner_token_b = self.ensure_token_account(&owner, &state.mint_b()).await?;
        let ix = self
            .builder
            .terminate(pool, &state, &owner, &owner_token_a, &owner_token_b)?;
        self.orchestrator
            .execute_traced(TransactionPlan::single(ix), &TraceContext::new("terminate"))
            .await
    }

    /// Withdraw collected fees
    ///
    /// Single-fee pools pay to `fee_receiver`, or the owner's token account
    /// for the fee mint when none is given. Five-tier pools always pay their
    /// stored receivers.
    pub async fn withdraw_fee(
        &self,
        pool: &Pubkey,
        fee_receiver: Option<Pubkey>,
    ) -> AmmResult<SubmissionOutcome> {
        let state = self.fetch_pool(pool).await?;
        let owner = self.owner_of(&state)?;
        self.verify_vault_authority(pool, &state).await?;
        let receiver = match (state.fee_receivers().is_empty(), fee_receiver) {
            (true, Some(receiver)) => Some(receiver),
            (true, None) => Some(self.ensure_token_account(&owner, &state.fee_mint()).await?),
            (false, explicit) => explicit,
        };
        let ix = self
            .builder
            .withdraw_fee(pool, &state, &owner, receiver.as_ref())?;
        self.orchestrator
            .execute_traced(TransactionPlan::single(ix), &TraceContext::new("withdraw_fee"))
            .await
    }

    /// Pools of this program matching `filter`
    pub async fn find_pools(&self, filter: &PoolFilter) -> AmmResult<Vec<PoolView>> {
        find_pools(self.accounts.as_ref(), &self.program_ids().amm, filter).await
    }

    /// Associated token account of `wallet` for `mint`, which must exist
    async fn ensure_token_account(&self, wallet: &Pubkey, mint: &Pubkey) -> AmmResult<Pubkey> {
        let account =
            get_associated_token_address_with_program_id(wallet, mint, &self.program_ids().token);
        match self.accounts.account_data(&account).await? {
            Some(_) => Ok(account),
            None => Err(AmmError::MissingTokenAccount {
                account: account.to_string(),
                mint: mint.to_string(),
            }),
        }
    }

    /// Check the stored nonce against the recorded owner of vault A
    ///
    /// A stale nonce may still land off the curve and yield some other
    /// authority; only the vault owner tells them apart.
    async fn verify_vault_authority(&self, pool: &Pubkey, state: &PoolState) -> AmmResult<()> {
        let vault_address = state.vault_a();
        let data = self
            .accounts
            .account_data(&vault_address)
            .await?
            .ok_or_else(|| AmmError::upstream("vault", format!("vault {vault_address} not found")))?;
        let vault = spl_token::state::Account::unpack(&data).map_err(|e| {
            AmmError::invalid_argument(format!("vault {vault_address} is not a token account: {e}"))
        })?;
        verify_pool_authority(pool, state.nonce(), &vault.owner, &self.program_ids().amm)
    }

    fn owner_of(&self, state: &PoolState) -> AmmResult<Pubkey> {
        let wallet = self.wallet();
        if state.owner() != wallet {
            return Err(AmmError::invalid_argument(format!(
                "wallet {wallet} does not own this pool (owner {})",
                state.owner()
            )));
        }
        Ok(wallet)
    }

    fn record_quote(
        &self,
        logger: &StructuredLogger,
        pool: &Pubkey,
        result: AmmResult<Quote>,
    ) -> AmmResult<Quote> {
        match result {
            Ok(quote) => {
                self.count_quote(logger, pool, &quote);
                Ok(quote)
            }
            Err(e) => {
                self.reject_quote(logger, pool, &e);
                Err(e)
            }
        }
    }

    fn count_quote(&self, logger: &StructuredLogger, pool: &Pubkey, quote: &Quote) {
        logger.log_quote(&pool.to_string(), quote);
        if let Some(metrics) = &self.metrics {
            metrics.quotes_total.inc();
        }
    }

    fn reject_quote(&self, logger: &StructuredLogger, pool: &Pubkey, error: &AmmError) {
        logger.log_quote_rejected(&pool.to_string(), error);
        if let Some(metrics) = &self.metrics {
            metrics.quotes_rejected.inc();
        }
    }
}

/// Decoded state of `pool`, read without a wallet
pub async fn fetch_pool(accounts: &dyn AccountSource, pool: &Pubkey) -> AmmResult<PoolState> {
    let data = accounts
        .account_data(pool)
        .await?
        .ok_or_else(|| AmmError::PoolNotFound(pool.to_string()))?;
    decode_pool(&data)
}

/// Pools owned by `program` matching `filter`
///
/// Accounts that fail to decode are skipped with a debug log.
pub async fn find_pools(
    accounts: &dyn AccountSource,
    program: &Pubkey,
    filter: &PoolFilter,
) -> AmmResult<Vec<PoolView>> {
    let found = accounts
        .program_accounts(program, &filter.account_filters())
        .await?;

    let mut pools = Vec::with_capacity(found.len());
    for (address, data) in found {
        match decode_pool(&data) {
            Ok(state) => pools.push(PoolView::from_state(&state).with_address(&address)),
            Err(e) => debug!(pool = %address, error = %e, "Skipping undecodable account"),
        }
    }
    Ok(pools)
}

fn ensure_active(pool: &Pubkey, state: &PoolState) -> AmmResult<()> {
    match state.status() {
        PoolStatus::Active => Ok(()),
        status => Err(AmmError::invalid_argument(format!(
            "pool {pool} is {status}, swaps need an active pool"
        ))),
    }
}

fn serialize_pubkey<S: serde::Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(key)
}
