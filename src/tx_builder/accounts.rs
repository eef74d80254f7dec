//! Account roles and fixed account orderings
//!
//! The position of every account in an instruction is part of the wire
//! contract. The orderings live here as data so builders and tests share one
//! source.

use serde::Serialize;
use solana_sdk::instruction::AccountMeta;
use solana_sdk::pubkey::Pubkey;
use std::fmt;

use crate::types::LayoutVersion;

/// AMM operation carried by a built instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    Initialize,
    UpdatePool,
    UpdateStatus,
    UpdateTolerance,
    Swap,
    WithdrawFee,
    Terminate,
    /// Seeded pool account allocation
    CreatePoolAccount,
    /// Token vault allocation
    CreateVault,
    /// Token vault initialisation to the pool authority
    InitializeVault,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "Initialize",
            Self::UpdatePool => "UpdatePool",
            Self::UpdateStatus => "UpdateStatus",
            Self::UpdateTolerance => "UpdateTolerance",
            Self::Swap => "Swap",
            Self::WithdrawFee => "WithdrawFee",
            Self::Terminate => "Terminate",
            Self::CreatePoolAccount => "CreatePoolAccount",
            Self::CreateVault => "CreateVault",
            Self::InitializeVault => "InitializeVault",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named position of an account in an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AccountRole {
    Pool,
    Owner,
    User,
    MintA,
    MintB,
    VaultA,
    VaultB,
    FeeVault,
    PoolAuthority,
    OwnerTokenA,
    OwnerTokenB,
    UserTokenA,
    UserTokenB,
    FeeReceiver,
    /// Tier receiver, zero-based
    TierReceiver(u8),
    FeeMint,
    TokenProgram,
    /// Accounts of non-AMM setup instructions
    Other,
}

/// `(role, is_signer, is_writable)`
pub type AccountSpec = (AccountRole, bool, bool);

use AccountRole::*;

const TIER_RECEIVERS_READONLY: [AccountSpec; 5] = [
    (TierReceiver(0), false, false),
    (TierReceiver(1), false, false),
    (TierReceiver(2), false, false),
    (TierReceiver(3), false, false),
    (TierReceiver(4), false, false),
];

const TIER_RECEIVERS_WRITABLE: [AccountSpec; 5] = [
    (TierReceiver(0), false, true),
    (TierReceiver(1), false, true),
    (TierReceiver(2), false, true),
    (TierReceiver(3), false, true),
    (TierReceiver(4), false, true),
];

pub const INITIALIZE_ACCOUNTS: [AccountSpec; 11] = [
    (Pool, false, true),
    (Owner, true, false),
    (MintA, false, false),
    (MintB, false, false),
    (VaultA, false, true),
    (VaultB, false, true),
    (FeeVault, false, false),
    (PoolAuthority, false, false),
    (OwnerTokenA, false, true),
    (OwnerTokenB, false, true),
    (TokenProgram, false, false),
];

pub const OWNER_ONLY_ACCOUNTS: [AccountSpec; 2] = [(Pool, false, true), (Owner, true, false)];

pub const SWAP_ACCOUNTS: [AccountSpec; 9] = [
    (Pool, false, true),
    (VaultA, false, true),
    (VaultB, false, true),
    (FeeVault, false, true),
    (PoolAuthority, false, false),
    (User, true, false),
    (UserTokenA, false, true),
    (UserTokenB, false, true),
    (TokenProgram, false, false),
];

pub const TERMINATE_ACCOUNTS: [AccountSpec; 9] = [
    (Pool, false, true),
    (Owner, true, false),
    (VaultA, false, true),
    (VaultB, false, true),
    (FeeVault, false, true),
    (PoolAuthority, false, false),
    (OwnerTokenA, false, true),
    (OwnerTokenB, false, true),
    (TokenProgram, false, false),
];

/// Account ordering of `operation` for a pool of layout `version`
///
/// Setup operations have no fixed AMM ordering and yield an empty list.
pub fn account_specs(operation: Operation, version: LayoutVersion) -> Vec<AccountSpec> {
    let tiered = version == LayoutVersion::TieredFee;
    match operation {
        Operation::Initialize => {
            let mut specs = INITIALIZE_ACCOUNTS.to_vec();
            if tiered {
                specs.extend_from_slice(&TIER_RECEIVERS_READONLY);
                specs.push((FeeMint, false, false));
            }
            specs
        }
        Operation::UpdatePool | Operation::UpdateStatus | Operation::UpdateTolerance => {
            OWNER_ONLY_ACCOUNTS.to_vec()
        }
        Operation::Swap => SWAP_ACCOUNTS.to_vec(),
        Operation::WithdrawFee => {
            let mut specs = vec![(Pool, false, true), (Owner, true, false), (FeeVault, false, true)];
            if tiered {
                specs.extend_from_slice(&TIER_RECEIVERS_WRITABLE);
            } else {
                specs.push((FeeReceiver, false, true));
            }
            specs.push((PoolAuthority, false, false));
            specs.push((TokenProgram, false, false));
            specs
        }
        Operation::Terminate => TERMINATE_ACCOUNTS.to_vec(),
        Operation::CreatePoolAccount | Operation::CreateVault | Operation::InitializeVault => {
            Vec::new()
        }
    }
}

/// Pair each spec with its address in order
pub(crate) fn metas(specs: &[AccountSpec], keys: &[Pubkey]) -> Vec<AccountMeta> {
    debug_assert_eq!(specs.len(), keys.len());
    specs
        .iter()
        .zip(keys)
        .map(|(&(_, is_signer, is_writable), key)| {
            if is_writable {
                AccountMeta::new(*key, is_signer)
            } else {
                AccountMeta::new_readonly(*key, is_signer)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdraw_fee_orderings() {
        let single = account_specs(Operation::WithdrawFee, LayoutVersion::SingleFee);
        assert_eq!(single.len(), 6);
        assert_eq!(single[3], (FeeReceiver, false, true));
        assert_eq!(single[4].0, PoolAuthority);

        let tiered = account_specs(Operation::WithdrawFee, LayoutVersion::TieredFee);
        assert_eq!(tiered.len(), 10);
        assert_eq!(tiered[3], (TierReceiver(0), false, true));
        assert_eq!(tiered[7], (TierReceiver(4), false, true));
        assert_eq!(tiered[9].0, TokenProgram);
    }

    #[test]
    fn test_initialize_tiered_appends_receivers() {
        let specs = account_specs(Operation::Initialize, LayoutVersion::TieredFee);
        assert_eq!(specs.len(), 17);
        assert_eq!(&specs[..11], &INITIALIZE_ACCOUNTS);
        assert_eq!(specs[16].0, FeeMint);
    }

    #[test]
    fn test_single_signer_per_instruction() {
        for op in [
            Operation::Initialize,
            Operation::UpdateStatus,
            Operation::Swap,
            Operation::WithdrawFee,
            Operation::Terminate,
        ] {
            for version in [LayoutVersion::SingleFee, LayoutVersion::TieredFee] {
                let signers = account_specs(op, version)
                    .iter()
                    .filter(|(_, is_signer, _)| *is_signer)
                    .count();
                assert_eq!(signers, 1, "{op} {version}");
            }
        }
    }
}
