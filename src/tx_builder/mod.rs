//! AMM instruction builder
//!
//! Maps each pool operation to a `(payload, account list)` pair the on-chain
//! program accepts.
//!
//! ## Architecture
//!
//! - **accounts**: operation tags, account roles and the fixed orderings
//! - **instructions**: one pure builder method per operation
//! - **setup**: composite plans (pool creation, two-pool swaps)
//! - **plan**: ordered instruction lists with their extra signers
//!
//! ## Key Policies
//!
//! - The vault authority always comes from the pool's stored nonce; a wrong
//!   nonce surfaces as `AddressMismatch`
//! - User token accounts are explicit inputs, nothing is created implicitly
//! - Amounts are smallest-unit integers; scaling is done by the caller
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use amm_client::config::ProgramIds;
//! use amm_client::tx_builder::{InstructionBuilder, SwapParams};
//! use amm_client::types::Direction;
//! # use amm_client::layout::PoolState;
//! # use solana_sdk::pubkey::Pubkey;
//!
//! # fn example(pool: Pubkey, state: PoolState, user: Pubkey, token_a: Pubkey, token_b: Pubkey)
//! #     -> amm_client::errors::AmmResult<()> {
//! let builder = InstructionBuilder::new(ProgramIds::new(Pubkey::new_unique()));
//! let swap = builder.swap(
//!     &pool,
//!     &state,
//!     &SwapParams {
//!         user,
//!         user_token_a: token_a,
//!         user_token_b: token_b,
//!         amount: 1_000_000,
//!         direction: Direction::AToB,
//!     },
//! )?;
//! assert_eq!(swap.instruction.accounts.len(), 9);
//! # Ok(())
//! # }
//! ```

pub mod accounts;
mod instructions;
mod plan;
mod setup;

pub use accounts::{account_specs, AccountRole, AccountSpec, Operation};
pub use instructions::{
    BuiltInstruction, InitializeParams, InstructionBuilder, SwapParams, TierAccounts,
};
pub use plan::{sanity_check_ix_order, TransactionPlan};
pub use setup::{pool_account_len, CreatePoolParams, CreatePoolPlan, TOKEN_ACCOUNT_LEN};
