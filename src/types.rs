//! Common types used throughout the client

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{AmmError, AmmResult};

/// Fixed-point denominator of every fee fraction (parts per million)
pub const FEE_DENOMINATOR: u64 = 1_000_000;

/// Number of fee tiers carried by the five-tier pool layout
pub const FEE_TIERS: usize = 5;

/// Pool lifecycle status, one byte on the wire
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    Uninitialized = 0,
    Active = 1,
    Paused = 2,
    Terminated = 3,
}

impl PoolStatus {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> AmmResult<Self> {
        match value {
            0 => Ok(Self::Uninitialized),
            1 => Ok(Self::Active),
            2 => Ok(Self::Paused),
            3 => Ok(Self::Terminated),
            _ => Err(AmmError::InvalidEnumValue {
                field: "status",
                value,
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Terminated => "terminated",
        }
    }
}

impl TryFrom<u8> for PoolStatus {
    type Error = AmmError;

    fn try_from(value: u8) -> AmmResult<Self> {
        Self::from_u8(value)
    }
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolStatus {
    type Err = AmmError;

    fn from_str(s: &str) -> AmmResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "uninitialized" => Ok(Self::Uninitialized),
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "terminated" => Ok(Self::Terminated),
            other => Err(AmmError::invalid_argument(format!(
                "unknown pool status '{other}'"
            ))),
        }
    }
}

/// Swap direction
///
/// The swap amount is always denominated in token A: for `AToB` it is the
/// amount of A paid in, for `BToA` the amount of A taken out of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "a2b")]
    AToB,
    #[serde(rename = "b2a")]
    BToA,
}

impl Direction {
    /// Wire encoding: 1 is A to B, 2 is B to A
    pub fn as_wire(self) -> u8 {
        match self {
            Self::AToB => 1,
            Self::BToA => 2,
        }
    }

    pub fn from_wire(value: u8) -> AmmResult<Self> {
        match value {
            1 => Ok(Self::AToB),
            2 => Ok(Self::BToA),
            _ => Err(AmmError::InvalidEnumValue {
                field: "direction",
                value,
            }),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AToB => f.write_str("A to B"),
            Self::BToA => f.write_str("B to A"),
        }
    }
}

impl FromStr for Direction {
    type Err = AmmError;

    fn from_str(s: &str) -> AmmResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "a2b" | "a-to-b" | "1" => Ok(Self::AToB),
            "b2a" | "b-to-a" | "2" => Ok(Self::BToA),
            other => Err(AmmError::invalid_argument(format!(
                "unknown direction '{other}' (expected a2b or b2a)"
            ))),
        }
    }
}

/// Which pool account layout a record was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutVersion {
    /// One fee fraction, no separate receivers (226 bytes)
    SingleFee,
    /// Five fee tiers with independent receivers and a fee mint (450 bytes)
    TieredFee,
}

impl LayoutVersion {
    pub fn name(self) -> &'static str {
        match self {
            Self::SingleFee => "single_fee",
            Self::TieredFee => "tiered_fee",
        }
    }
}

impl fmt::Display for LayoutVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fee configuration of a pool in parts per million
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeSchedule {
    Single(u64),
    Tiered([u64; FEE_TIERS]),
}

impl FeeSchedule {
    pub fn version(&self) -> LayoutVersion {
        match self {
            Self::Single(_) => LayoutVersion::SingleFee,
            Self::Tiered(_) => LayoutVersion::TieredFee,
        }
    }

    pub fn tiers(&self) -> &[u64] {
        match self {
            Self::Single(fee) => std::slice::from_ref(fee),
            Self::Tiered(fees) => fees,
        }
    }

    /// Every tier must lie within the fixed-point range
    pub fn validate(&self) -> AmmResult<()> {
        for &fee in self.tiers() {
            if fee > FEE_DENOMINATOR {
                return Err(AmmError::FieldOverflow {
                    field: "fee",
                    value: fee as u128,
                    max: FEE_DENOMINATOR as u128,
                });
            }
        }
        Ok(())
    }

    /// Sum of all tiers; the total may not exceed the denominator either
    pub fn total_ppm(&self) -> AmmResult<u64> {
        self.validate()?;
        let total: u64 = self.tiers().iter().sum();
        if total > FEE_DENOMINATOR {
            return Err(AmmError::FieldOverflow {
                field: "fee_total",
                value: total as u128,
                max: FEE_DENOMINATOR as u128,
            });
        }
        Ok(total)
    }

    /// Decimal fractions for display only
    pub fn as_fractions(&self) -> Vec<f64> {
        self.tiers()
            .iter()
            .map(|&fee| fee as f64 / FEE_DENOMINATOR as f64)
            .collect()
    }
}
