//! Per-operation instruction builders
//!
//! Every builder is pure: it takes addresses and amounts, derives the vault
//! authority from the pool's stored nonce, encodes the payload and pairs it
//! with the fixed account ordering of the operation. Nothing here performs
//! I/O or creates accounts as a side effect.

use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use super::accounts::{account_specs, metas, AccountRole, AccountSpec, Operation};
use crate::address::pool_authority;
use crate::config::ProgramIds;
use crate::errors::{AmmError, AmmResult};
use crate::layout::{AmmInstruction, PoolState};
use crate::types::{Direction, FeeSchedule, LayoutVersion, PoolStatus, FEE_TIERS};

/// An encoded instruction together with its operation and account roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltInstruction {
    pub operation: Operation,
    pub instruction: Instruction,
    pub roles: Vec<AccountRole>,
}

impl BuiltInstruction {
    pub(crate) fn new(operation: Operation, instruction: Instruction, specs: &[AccountSpec]) -> Self {
        Self {
            operation,
            instruction,
            roles: specs.iter().map(|(role, _, _)| *role).collect(),
        }
    }

    /// Setup instruction produced by the system or token program
    pub(crate) fn setup(operation: Operation, instruction: Instruction) -> Self {
        let roles = vec![AccountRole::Other; instruction.accounts.len()];
        Self {
            operation,
            instruction,
            roles,
        }
    }

    /// Address bound to `role`, if the instruction carries it
    pub fn account(&self, role: AccountRole) -> Option<Pubkey> {
        self.roles
            .iter()
            .position(|r| *r == role)
            .map(|i| self.instruction.accounts[i].pubkey)
    }

    pub fn into_instruction(self) -> Instruction {
        self.instruction
    }
}

/// Receivers and fee mint of a five-tier pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierAccounts {
    pub fee_receivers: [Pubkey; FEE_TIERS],
    pub fee_mint: Pubkey,
}

/// Inputs of the Initialize instruction
#[derive(Debug, Clone, Copy)]
pub struct InitializeParams {
    pub pool: Pubkey,
    pub owner: Pubkey,
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub vault_a: Pubkey,
    pub vault_b: Pubkey,
    pub fee_vault: Pubkey,
    /// Bump found for the pool authority
    pub nonce: u8,
    pub owner_token_a: Pubkey,
    pub owner_token_b: Pubkey,
    pub fees: FeeSchedule,
    pub amount_a: u64,
    pub amount_b: u64,
    pub tolerance: u64,
    /// Required exactly when `fees` is tiered
    pub tiers: Option<TierAccounts>,
}

/// Inputs of the Swap instruction
#[derive(Debug, Clone, Copy)]
pub struct SwapParams {
    pub user: Pubkey,
    pub user_token_a: Pubkey,
    pub user_token_b: Pubkey,
    /// Token A amount in smallest units
    pub amount: u64,
    pub direction: Direction,
}

/// Builds AMM instructions for one set of program identifiers
#[derive(Debug, Clone, Copy)]
pub struct InstructionBuilder {
    ids: ProgramIds,
}

impl InstructionBuilder {
    pub fn new(ids: ProgramIds) -> Self {
        Self { ids }
    }

    pub fn program_ids(&self) -> &ProgramIds {
        &self.ids
    }

    /// Vault authority of `pool` from its stored nonce
    pub fn authority(&self, pool: &Pubkey, nonce: u8) -> AmmResult<Pubkey> {
        pool_authority(pool, nonce, &self.ids.amm)
    }

    pub fn initialize(&self, params: &InitializeParams) -> AmmResult<BuiltInstruction> {
        if params.amount_a == 0 || params.amount_b == 0 {
            return Err(AmmError::invalid_argument(
                "initial deposits of both tokens must be positive",
            ));
        }
        params.fees.total_ppm()?;

        let version = params.fees.version();
        let authority = self.authority(&params.pool, params.nonce)?;
        let mut keys = vec![
            params.pool,
            params.owner,
            params.mint_a,
            params.mint_b,
            params.vault_a,
            params.vault_b,
            params.fee_vault,
            authority,
            params.owner_token_a,
            params.owner_token_b,
            self.ids.token,
        ];
        match (version, params.tiers) {
            (LayoutVersion::SingleFee, None) => {}
            (LayoutVersion::TieredFee, Some(tiers)) => {
                keys.extend_from_slice(&tiers.fee_receivers);
                keys.push(tiers.fee_mint);
            }
            (LayoutVersion::SingleFee, Some(_)) => {
                return Err(AmmError::invalid_argument(
                    "single-fee pools take no tier receivers",
                ))
            }
            (LayoutVersion::TieredFee, None) => {
                return Err(AmmError::invalid_argument(
                    "five-tier pools need five fee receivers and a fee mint",
                ))
            }
        }

        let payload = AmmInstruction::Initialize {
            nonce: params.nonce,
            fees: params.fees,
            amount_a: params.amount_a,
            amount_b: params.amount_b,
            tolerance: params.tolerance,
        };
        self.build(Operation::Initialize, version, payload, &keys)
    }

    pub fn update_pool(&self, pool: &Pubkey, owner: &Pubkey) -> AmmResult<BuiltInstruction> {
        self.build(
            Operation::UpdatePool,
            LayoutVersion::SingleFee,
            AmmInstruction::UpdatePool,
            &[*pool, *owner],
        )
    }

    pub fn update_status(
        &self,
        pool: &Pubkey,
        owner: &Pubkey,
        status: PoolStatus,
    ) -> AmmResult<BuiltInstruction> {
        self.build(
            Operation::UpdateStatus,
            LayoutVersion::SingleFee,
            AmmInstruction::UpdateStatus { status },
            &[*pool, *owner],
        )
    }

    pub fn update_tolerance(
        &self,
        pool: &Pubkey,
        owner: &Pubkey,
        tolerance: u64,
    ) -> AmmResult<BuiltInstruction> {
        self.build(
            Operation::UpdateTolerance,
            LayoutVersion::SingleFee,
            AmmInstruction::UpdateTolerance { tolerance },
            &[*pool, *owner],
        )
    }

    /// Swap against `pool`
    ///
    /// The account list is the same nine entries in the same order for
    /// either direction.
    pub fn swap(
        &self,
        pool: &Pubkey,
        state: &PoolState,
        params: &SwapParams,
    ) -> AmmResult<BuiltInstruction> {
        if params.amount == 0 {
            return Err(AmmError::invalid_argument("swap amount must be positive"));
        }

        let authority = self.authority(pool, state.nonce())?;
        let keys = [
            *pool,
            state.vault_a(),
            state.vault_b(),
            state.fee_vault(),
            authority,
            params.user,
            params.user_token_a,
            params.user_token_b,
            self.ids.token,
        ];
        let payload = AmmInstruction::Swap {
            amount: params.amount,
            direction: params.direction,
        };
        self.build(Operation::Swap, state.version(), payload, &keys)
    }

    /// Move collected fees out of the fee vault
    ///
    /// Single-fee pools pay to `fee_receiver`, which is required. Five-tier
    /// pools always pay to their stored receivers and reject an explicit one.
    pub fn withdraw_fee(
        &self,
        pool: &Pubkey,
        state: &PoolState,
        owner: &Pubkey,
        fee_receiver: Option<&Pubkey>,
    ) -> AmmResult<BuiltInstruction> {
        check_owner(state, owner)?;
        let authority = self.authority(pool, state.nonce())?;

        let mut keys = vec![*pool, *owner, state.fee_vault()];
        match (state.version(), fee_receiver) {
            (LayoutVersion::SingleFee, Some(receiver)) => keys.push(*receiver),
            (LayoutVersion::TieredFee, None) => keys.extend_from_slice(state.fee_receivers()),
            (LayoutVersion::SingleFee, None) => {
                return Err(AmmError::invalid_argument(
                    "single-fee pools need an explicit fee receiver account",
                ))
            }
            (LayoutVersion::TieredFee, Some(_)) => {
                return Err(AmmError::invalid_argument(
                    "five-tier pools pay out to their stored fee receivers",
                ))
            }
        }
        keys.push(authority);
        keys.push(self.ids.token);

        self.build(
            Operation::WithdrawFee,
            state.version(),
            AmmInstruction::WithdrawFee,
            &keys,
        )
    }

    /// Drain both vaults and the fee vault back to the owner
    pub fn terminate(
        &self,
        pool: &Pubkey,
        state: &PoolState,
        owner: &Pubkey,
        owner_token_a: &Pubkey,
        owner_token_b: &Pubkey,
    ) -> AmmResult<BuiltInstruction> {
        check_owner(state, owner)?;
        let authority = self.authority(pool, state.nonce())?;
        let keys = [
            *pool,
            *owner,
            state.vault_a(),
            state.vault_b(),
            state.fee_vault(),
            authority,
            *owner_token_a,
            *owner_token_b,
            self.ids.token,
        ];
        let payload = AmmInstruction::Terminate {
            version: state.version(),
        };
        self.build(Operation::Terminate, state.version(), payload, &keys)
    }

    fn build(
        &self,
        operation: Operation,
        version: LayoutVersion,
        payload: AmmInstruction,
        keys: &[Pubkey],
    ) -> AmmResult<BuiltInstruction> {
        let specs = account_specs(operation, version);
        if specs.len() != keys.len() {
            return Err(AmmError::invalid_argument(format!(
                "{operation} takes {} accounts, {} given",
                specs.len(),
                keys.len()
            )));
        }

        let data = payload.pack()?;
        debug!(
            operation = %operation,
            version = %version,
            accounts = keys.len(),
            data_len = data.len(),
            "Built instruction"
        );

        let instruction = Instruction {
            program_id: self.ids.amm,
            accounts: metas(&specs, keys),
            data,
        };
        Ok(BuiltInstruction::new(operation, instruction, &specs))
    }
}

fn check_owner(state: &PoolState, owner: &Pubkey) -> AmmResult<()> {
    if &state.owner() != owner {
        return Err(AmmError::invalid_argument(format!(
            "{owner} is not the pool owner ({})",
            state.owner()
        )));
    }
    Ok(())
}
