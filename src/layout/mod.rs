//! Fixed binary layouts shared with the on-chain program
//!
//! Every shape here is little-endian with no padding, and 32-byte addresses
//! are stored raw without a length prefix. Decoding requires the buffer to be
//! exactly the declared span; encoding always yields exactly the declared span
//! or fails with `FieldOverflow`.

mod instruction;
mod pool;

pub use instruction::{discriminant, AmmInstruction};
pub use pool::{
    offsets, PoolState, SingleFeePool, TieredFeePool, SINGLE_FEE_POOL_LEN, TIERED_FEE_POOL_LEN,
};

use crate::errors::{AmmError, AmmResult};
use crate::types::FEE_DENOMINATOR;

/// A fixed-span binary structure
pub trait Layout: Sized {
    /// Name reported in `MalformedLayout` diagnostics
    const NAME: &'static str;

    /// Exact byte length of the encoded form
    const SPAN: usize;

    fn decode(src: &[u8]) -> AmmResult<Self>;

    fn encode(&self) -> AmmResult<Vec<u8>>;
}

pub(crate) fn check_span(layout: &'static str, src: &[u8], span: usize) -> AmmResult<()> {
    if src.len() != span {
        return Err(AmmError::malformed(layout, span, src.len()));
    }
    Ok(())
}

pub(crate) fn check_fee(field: &'static str, value: u64) -> AmmResult<()> {
    if value > FEE_DENOMINATOR {
        return Err(AmmError::FieldOverflow {
            field,
            value: value as u128,
            max: FEE_DENOMINATOR as u128,
        });
    }
    Ok(())
}
