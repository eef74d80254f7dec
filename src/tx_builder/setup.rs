//! Composite plans: pool creation and two-pool swaps
//!
//! Pool creation allocates the seeded pool account, creates the three token
//! vaults owned by the pool authority and then initialises the pool, all in
//! one transaction. The vault keypairs travel with the plan as extra signers.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::system_instruction;
use spl_token::solana_program::program_pack::Pack;
use tracing::info;

use super::accounts::Operation;
use super::instructions::{
    BuiltInstruction, InitializeParams, InstructionBuilder, SwapParams, TierAccounts,
};
use super::plan::{sanity_check_ix_order, TransactionPlan};
use crate::address::{derive_seeded, find_pool_authority};
use crate::errors::{AmmError, AmmResult};
use crate::layout::{PoolState, SINGLE_FEE_POOL_LEN, TIERED_FEE_POOL_LEN};
use crate::quote::SuperSwapQuote;
use crate::types::{Direction, FeeSchedule, LayoutVersion};

/// Byte length of an SPL token account
pub const TOKEN_ACCOUNT_LEN: usize = spl_token::state::Account::LEN;

/// Inputs of a pool creation
#[derive(Debug, Clone)]
pub struct CreatePoolParams {
    /// Funds the new accounts, signs, and becomes the pool owner
    pub owner: Pubkey,
    pub seed: String,
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub owner_token_a: Pubkey,
    pub owner_token_b: Pubkey,
    pub fees: FeeSchedule,
    pub amount_a: u64,
    pub amount_b: u64,
    pub tolerance: u64,
    pub tiers: Option<TierAccounts>,
    /// Rent-exempt minimum for the pool account
    pub pool_rent: u64,
    /// Rent-exempt minimum for a token account
    pub vault_rent: u64,
}

/// Addresses fixed by a pool creation together with its plan
#[derive(Debug)]
pub struct CreatePoolPlan {
    pub pool: Pubkey,
    pub seed: String,
    pub nonce: u8,
    pub authority: Pubkey,
    pub vault_a: Pubkey,
    pub vault_b: Pubkey,
    pub fee_vault: Pubkey,
    pub plan: TransactionPlan,
}

/// Pool account size for a fee configuration
pub fn pool_account_len(version: LayoutVersion) -> usize {
    match version {
        LayoutVersion::SingleFee => SINGLE_FEE_POOL_LEN,
        LayoutVersion::TieredFee => TIERED_FEE_POOL_LEN,
    }
}

impl InstructionBuilder {
    /// Build a pool creation with freshly generated vault keypairs
    pub fn create_pool(&self, params: &CreatePoolParams) -> AmmResult<CreatePoolPlan> {
        self.create_pool_with_vaults(params, [Keypair::new(), Keypair::new(), Keypair::new()])
    }

    /// Build a pool creation with caller-supplied vault keypairs
    /// (vault A, vault B, fee vault)
    pub fn create_pool_with_vaults(
        &self,
        params: &CreatePoolParams,
        vaults: [Keypair; 3],
    ) -> AmmResult<CreatePoolPlan> {
        let ids = *self.program_ids();
        let version = params.fees.version();
        let pool = derive_seeded(&params.owner, &params.seed, &ids.amm)?;
        let (authority, nonce) = find_pool_authority(&pool, &ids.amm)?;

        let [vault_a, vault_b, fee_vault] = vaults;
        let fee_mint = match (version, &params.tiers) {
            (LayoutVersion::TieredFee, Some(tiers)) => tiers.fee_mint,
            _ => params.mint_b,
        };

        let mut instructions = vec![BuiltInstruction::setup(
            Operation::CreatePoolAccount,
            system_instruction::create_account_with_seed(
                &params.owner,
                &pool,
                &params.owner,
                &params.seed,
                params.pool_rent,
                pool_account_len(version) as u64,
                &ids.amm,
            ),
        )];

        for (vault, mint) in [
            (&vault_a, params.mint_a),
            (&vault_b, params.mint_b),
            (&fee_vault, fee_mint),
        ] {
            instructions.push(BuiltInstruction::setup(
                Operation::CreateVault,
                system_instruction::create_account(
                    &params.owner,
                    &vault.pubkey(),
                    params.vault_rent,
                    TOKEN_ACCOUNT_LEN as u64,
                    &ids.token,
                ),
            ));
            let init = spl_token::instruction::initialize_account(
                &ids.token,
                &vault.pubkey(),
                &mint,
                &authority,
            )
            .map_err(|e| AmmError::invalid_argument(format!("token vault initialisation: {e}")))?;
            instructions.push(BuiltInstruction::setup(Operation::InitializeVault, init));
        }

        instructions.push(self.initialize(&InitializeParams {
            pool,
            owner: params.owner,
            mint_a: params.mint_a,
            mint_b: params.mint_b,
            vault_a: vault_a.pubkey(),
            vault_b: vault_b.pubkey(),
            fee_vault: fee_vault.pubkey(),
            nonce,
            owner_token_a: params.owner_token_a,
            owner_token_b: params.owner_token_b,
            fees: params.fees,
            amount_a: params.amount_a,
            amount_b: params.amount_b,
            tolerance: params.tolerance,
            tiers: params.tiers,
        })?);

        let plan = CreatePoolPlan {
            pool,
            seed: params.seed.clone(),
            nonce,
            authority,
            vault_a: vault_a.pubkey(),
            vault_b: vault_b.pubkey(),
            fee_vault: fee_vault.pubkey(),
            plan: TransactionPlan::new(instructions).with_signers(vec![vault_a, vault_b, fee_vault]),
        };
        sanity_check_ix_order(&plan.plan)?;

        info!(
            pool = %plan.pool,
            seed = %plan.seed,
            nonce = plan.nonce,
            version = %version,
            instructions = plan.plan.len(),
            "Planned pool creation"
        );
        Ok(plan)
    }

    /// Two Swap instructions for an already quoted route
    ///
    /// The quote has to come first so that either leg failing aborts before
    /// anything is built. `user_tokens` holds the user's token account for the
    /// first pool's input mint, the intermediate mint and the final mint.
    pub fn super_swap(
        &self,
        first: (&Pubkey, &PoolState),
        second: (&Pubkey, &PoolState),
        user: &Pubkey,
        user_tokens: [Pubkey; 3],
        quote: &SuperSwapQuote,
    ) -> AmmResult<TransactionPlan> {
        let (first_pool, first_state) = first;
        let (second_pool, second_state) = second;
        let [input_token, intermediate_token, output_token] = user_tokens;

        if second_state.mint_a() != quote.intermediate_mint {
            return Err(AmmError::RouteMismatch {
                intermediate: quote.intermediate_mint.to_string(),
                second_mint_a: second_state.mint_a().to_string(),
            });
        }

        // Leg 1 token A account is the input for A to B, the intermediate for B to A
        let (first_token_a, first_token_b) = match quote.first.direction {
            Direction::AToB => (input_token, intermediate_token),
            Direction::BToA => (intermediate_token, input_token),
        };

        let first_ix = self.swap(
            first_pool,
            first_state,
            &SwapParams {
                user: *user,
                user_token_a: first_token_a,
                user_token_b: first_token_b,
                amount: quote.first.amount,
                direction: quote.first.direction,
            },
        )?;
        let second_ix = self.swap(
            second_pool,
            second_state,
            &SwapParams {
                user: *user,
                user_token_a: intermediate_token,
                user_token_b: output_token,
                amount: quote.second.amount,
                direction: Direction::AToB,
            },
        )?;

        Ok(TransactionPlan::new(vec![first_ix, second_ix]))
    }
}
