//! Transaction plans
//!
//! A plan is the ordered instruction list handed to the orchestrator plus the
//! keypairs of accounts created inside the same transaction. Order is kept
//! exactly as built: vault creation has to precede the Initialize that
//! references the vaults.

use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};

use super::accounts::{AccountRole, Operation};
use super::instructions::BuiltInstruction;
use crate::errors::{AmmError, AmmResult};

/// Ordered instructions and the extra signers they require
#[derive(Debug, Default)]
pub struct TransactionPlan {
    pub instructions: Vec<BuiltInstruction>,
    /// Newly created accounts that must co-sign
    pub extra_signers: Vec<Keypair>,
}

impl TransactionPlan {
    pub fn new(instructions: Vec<BuiltInstruction>) -> Self {
        Self {
            instructions,
            extra_signers: Vec::new(),
        }
    }

    pub fn single(instruction: BuiltInstruction) -> Self {
        Self::new(vec![instruction])
    }

    pub fn with_signers(mut self, signers: Vec<Keypair>) -> Self {
        self.extra_signers = signers;
        self
    }

    pub fn push(&mut self, instruction: BuiltInstruction) {
        self.instructions.push(instruction);
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.instructions.iter().map(|ix| ix.operation).collect()
    }

    pub fn signer_pubkeys(&self) -> Vec<Pubkey> {
        self.extra_signers.iter().map(Signer::pubkey).collect()
    }

    /// Raw instructions in plan order
    pub fn instructions(&self) -> Vec<Instruction> {
        self.instructions
            .iter()
            .map(|ix| ix.instruction.clone())
            .collect()
    }
}

/// Validate instruction ordering of a plan (debug/test only)
///
/// Checks that the plan is not empty, that every vault is created before it
/// is initialised, and that an Initialize comes after all setup instructions
/// and only references vaults set up earlier in the plan when any are.
#[cfg(debug_assertions)]
pub fn sanity_check_ix_order(plan: &TransactionPlan) -> AmmResult<()> {
    if plan.is_empty() {
        return Err(AmmError::invalid_argument("Instruction list is empty"));
    }

    let mut created: Vec<Pubkey> = Vec::new();
    let mut initialized: Vec<Pubkey> = Vec::new();

    for (idx, ix) in plan.instructions.iter().enumerate() {
        match ix.operation {
            Operation::CreatePoolAccount | Operation::CreateVault => {
                // system create: [funder, new_account, ...]
                if let Some(meta) = ix.instruction.accounts.get(1) {
                    created.push(meta.pubkey);
                }
            }
            Operation::InitializeVault => {
                // token initialize_account: [account, mint, owner, rent]
                let vault = ix.instruction.accounts.first().map(|m| m.pubkey);
                match vault {
                    Some(vault) if created.contains(&vault) => initialized.push(vault),
                    _ => {
                        return Err(AmmError::invalid_argument(format!(
                            "vault initialised at position {idx} before it was created"
                        )))
                    }
                }
            }
            Operation::Initialize if !initialized.is_empty() => {
                for role in [AccountRole::VaultA, AccountRole::VaultB, AccountRole::FeeVault] {
                    let key = ix.account(role);
                    if !key.is_some_and(|k| initialized.contains(&k)) {
                        return Err(AmmError::invalid_argument(format!(
                            "Initialize at position {idx} references {role:?} not set up earlier"
                        )));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// No-op version of sanity_check_ix_order for release builds
#[cfg(not(debug_assertions))]
#[inline]
pub fn sanity_check_ix_order(_plan: &TransactionPlan) -> AmmResult<()> {
    Ok(())
}
