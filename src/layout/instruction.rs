//! Instruction payloads
//!
//! A payload is one discriminant byte followed by a fixed-width body whose
//! shape depends on the discriminant. Discriminant 1 is shared by UpdatePool
//! and (in the single-fee program) Terminate; only the account list tells them
//! apart, see [`AmmInstruction::unpack_with_accounts`].

use arrayref::{array_ref, array_refs};

use super::check_fee;
use crate::errors::{AmmError, AmmResult};
use crate::types::{Direction, FeeSchedule, LayoutVersion, PoolStatus, FEE_TIERS};

/// Operation selectors
pub mod discriminant {
    pub const INITIALIZE: u8 = 0;
    pub const UPDATE_POOL: u8 = 1;
    pub const UPDATE_STATUS: u8 = 2;
    pub const UPDATE_TOLERANCE: u8 = 3;
    /// Terminate as understood by the five-tier program
    pub const TERMINATE: u8 = 9;
    pub const SWAP: u8 = 10;
    pub const WITHDRAW_FEE: u8 = 80;
}

const INITIALIZE_SINGLE_BODY: usize = 1 + 8 + 8 * 3;
const INITIALIZE_TIERED_BODY: usize = 1 + 8 * FEE_TIERS + 8 * 3;

/// Account count of the Terminate instruction, used to disambiguate
/// discriminant 1
pub(crate) const TERMINATE_ACCOUNTS: usize = 9;
pub(crate) const UPDATE_POOL_ACCOUNTS: usize = 2;

/// Payloads understood by the AMM program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmmInstruction {
    Initialize {
        nonce: u8,
        fees: FeeSchedule,
        amount_a: u64,
        amount_b: u64,
        tolerance: u64,
    },
    UpdatePool,
    UpdateStatus {
        status: PoolStatus,
    },
    UpdateTolerance {
        tolerance: u64,
    },
    Swap {
        amount: u64,
        direction: Direction,
    },
    WithdrawFee,
    /// The single-fee program reuses the UpdatePool discriminant for this
    /// operation, the five-tier program has its own
    Terminate {
        version: LayoutVersion,
    },
}

impl AmmInstruction {
    pub fn discriminant(&self) -> u8 {
        match self {
            Self::Initialize { .. } => discriminant::INITIALIZE,
            Self::UpdatePool => discriminant::UPDATE_POOL,
            Self::UpdateStatus { .. } => discriminant::UPDATE_STATUS,
            Self::UpdateTolerance { .. } => discriminant::UPDATE_TOLERANCE,
            Self::Swap { .. } => discriminant::SWAP,
            Self::WithdrawFee => discriminant::WITHDRAW_FEE,
            Self::Terminate {
                version: LayoutVersion::SingleFee,
            } => discriminant::UPDATE_POOL,
            Self::Terminate {
                version: LayoutVersion::TieredFee,
            } => discriminant::TERMINATE,
        }
    }

    /// Exact encoded width, discriminant included
    pub fn span(&self) -> usize {
        1 + match self {
            Self::Initialize {
                fees: FeeSchedule::Single(_),
                ..
            } => INITIALIZE_SINGLE_BODY,
            Self::Initialize {
                fees: FeeSchedule::Tiered(_),
                ..
            } => INITIALIZE_TIERED_BODY,
            Self::UpdateStatus { .. } => 1,
            Self::UpdateTolerance { .. } => 8,
            Self::Swap { .. } => 8 + 1,
            Self::UpdatePool | Self::WithdrawFee | Self::Terminate { .. } => 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialize { .. } => "Initialize",
            Self::UpdatePool => "UpdatePool",
            Self::UpdateStatus { .. } => "UpdateStatus",
            Self::UpdateTolerance { .. } => "UpdateTolerance",
            Self::Swap { .. } => "Swap",
            Self::WithdrawFee => "WithdrawFee",
            Self::Terminate { .. } => "Terminate",
        }
    }

    pub fn pack(&self) -> AmmResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.span());
        buf.push(self.discriminant());

        match *self {
            Self::Initialize {
                nonce,
                fees,
                amount_a,
                amount_b,
                tolerance,
            } => {
                buf.push(nonce);
                for &fee in fees.tiers() {
                    check_fee("fee", fee)?;
                    buf.extend_from_slice(&fee.to_le_bytes());
                }
                buf.extend_from_slice(&amount_a.to_le_bytes());
                buf.extend_from_slice(&amount_b.to_le_bytes());
                buf.extend_from_slice(&tolerance.to_le_bytes());
            }
            Self::UpdateStatus { status } => buf.push(status.as_u8()),
            Self::UpdateTolerance { tolerance } => {
                buf.extend_from_slice(&tolerance.to_le_bytes());
            }
            Self::Swap { amount, direction } => {
                buf.extend_from_slice(&amount.to_le_bytes());
                buf.push(direction.as_wire());
            }
            Self::UpdatePool | Self::WithdrawFee | Self::Terminate { .. } => {}
        }

        debug_assert_eq!(buf.len(), self.span());
        Ok(buf)
    }

    /// Decode a payload on its own
    ///
    /// Discriminant 1 always decodes as `UpdatePool` here; use
    /// [`Self::unpack_with_accounts`] when the account list is available.
    pub fn unpack(input: &[u8]) -> AmmResult<Self> {
        let (&tag, rest) = input
            .split_first()
            .ok_or_else(|| AmmError::malformed("Instruction", 1, 0))?;

        let body = |name: &'static str, len: usize| -> AmmResult<()> {
            if rest.len() != len {
                return Err(AmmError::malformed(name, len + 1, input.len()));
            }
            Ok(())
        };

        Ok(match tag {
            discriminant::INITIALIZE => match rest.len() {
                INITIALIZE_SINGLE_BODY => {
                    let data = array_ref![rest, 0, INITIALIZE_SINGLE_BODY];
                    let (nonce, fee, amount_a, amount_b, tolerance) =
                        array_refs![data, 1, 8, 8, 8, 8];
                    Self::Initialize {
                        nonce: nonce[0],
                        fees: FeeSchedule::Single(u64::from_le_bytes(*fee)),
                        amount_a: u64::from_le_bytes(*amount_a),
                        amount_b: u64::from_le_bytes(*amount_b),
                        tolerance: u64::from_le_bytes(*tolerance),
                    }
                }
                INITIALIZE_TIERED_BODY => {
                    let data = array_ref![rest, 0, INITIALIZE_TIERED_BODY];
                    let (nonce, fees_buf, amount_a, amount_b, tolerance) =
                        array_refs![data, 1, 8 * FEE_TIERS, 8, 8, 8];
                    let mut fees = [0u64; FEE_TIERS];
                    for (src, dst) in fees_buf.chunks_exact(8).zip(fees.iter_mut()) {
                        *dst = u64::from_le_bytes(*array_ref![src, 0, 8]);
                    }
                    Self::Initialize {
                        nonce: nonce[0],
                        fees: FeeSchedule::Tiered(fees),
                        amount_a: u64::from_le_bytes(*amount_a),
                        amount_b: u64::from_le_bytes(*amount_b),
                        tolerance: u64::from_le_bytes(*tolerance),
                    }
                }
                _ => {
                    return Err(AmmError::malformed(
                        "Initialize",
                        INITIALIZE_SINGLE_BODY + 1,
                        input.len(),
                    ))
                }
            },
            discriminant::UPDATE_POOL => {
                body("UpdatePool", 0)?;
                Self::UpdatePool
            }
            discriminant::UPDATE_STATUS => {
                body("UpdateStatus", 1)?;
                Self::UpdateStatus {
                    status: PoolStatus::from_u8(rest[0])?,
                }
            }
            discriminant::UPDATE_TOLERANCE => {
                body("UpdateTolerance", 8)?;
                Self::UpdateTolerance {
                    tolerance: u64::from_le_bytes(*array_ref![rest, 0, 8]),
                }
            }
            discriminant::TERMINATE => {
                body("Terminate", 0)?;
                Self::Terminate {
                    version: LayoutVersion::TieredFee,
                }
            }
            discriminant::SWAP => {
                body("Swap", 9)?;
                let (amount, direction) = array_refs![array_ref![rest, 0, 9], 8, 1];
                Self::Swap {
                    amount: u64::from_le_bytes(*amount),
                    direction: Direction::from_wire(direction[0])?,
                }
            }
            discriminant::WITHDRAW_FEE => {
                body("WithdrawFee", 0)?;
                Self::WithdrawFee
            }
            other => return Err(AmmError::UnknownInstruction(other)),
        })
    }

    /// Decode a payload, resolving discriminant 1 by the account-list length
    pub fn unpack_with_accounts(input: &[u8], account_count: usize) -> AmmResult<Self> {
        let instruction = Self::unpack(input)?;
        if instruction != Self::UpdatePool {
            return Ok(instruction);
        }

        match account_count {
            UPDATE_POOL_ACCOUNTS => Ok(Self::UpdatePool),
            TERMINATE_ACCOUNTS => Ok(Self::Terminate {
                version: LayoutVersion::SingleFee,
            }),
            other => Err(AmmError::invalid_argument(format!(
                "discriminant 1 with {other} accounts matches neither UpdatePool nor Terminate"
            ))),
        }
    }
}
