//! Constant-product swap quoting
//!
//! All arithmetic is exact integer math in `u128`. The invariant baseline `k`
//! comes from the pool record (`k_a * k_b`), the reserves are the live vault
//! balances. The swap amount is always the token A side:
//!
//! - A to B: `a` is paid in, `b = (B·(A+a) − k) / (A+a)` is paid out
//! - B to A: `a` is taken out, `b = (k − B·(A−a)) / (A−a)` is paid in
//!
//! `b` is rounded half to even. Fees are charged in token B on top of the
//! gross `b`; the invariant check always uses the gross figure.

use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::errors::{AmmError, AmmResult};
use crate::layout::PoolState;
use crate::types::{Direction, FEE_DENOMINATOR};

/// Live vault balances in smallest units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reserves {
    pub a: u64,
    pub b: u64,
}

impl Reserves {
    pub fn new(a: u64, b: u64) -> Self {
        Self { a, b }
    }
}

/// Outcome of a single-pool quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub direction: Direction,
    /// Token A amount requested
    pub amount: u64,
    /// Token B amount before fees
    pub gross_amount: u64,
    /// Fee in token B
    pub fee_amount: u64,
    /// Token B received (A to B) or paid (B to A), fee included
    pub output_amount: u64,
    pub invariant_before: u128,
    pub invariant_after: u128,
    pub drift: u128,
    pub tolerance: u64,
    pub within_tolerance: bool,
}

impl Quote {
    /// Amount of the outgoing token the user ends up with
    pub fn delivered_amount(&self) -> u64 {
        match self.direction {
            Direction::AToB => self.output_amount,
            Direction::BToA => self.amount,
        }
    }

    /// Reject the quote when its counter amount crosses `limit`
    ///
    /// For A to B the limit is the minimum B received, for B to A it is the
    /// maximum B paid.
    pub fn enforce_limit(&self, limit: u64) -> AmmResult<()> {
        let crossed = match self.direction {
            Direction::AToB => self.output_amount < limit,
            Direction::BToA => self.output_amount > limit,
        };
        if crossed {
            return Err(AmmError::SlippageExceeded {
                quoted: self.output_amount,
                limit,
            });
        }
        Ok(())
    }
}

/// Round `num / den` to the nearest integer, ties to even
pub fn round_half_even(num: u128, den: u128) -> u128 {
    debug_assert!(den > 0);
    let quotient = num / den;
    let remainder = num % den;
    match remainder.cmp(&(den - remainder)) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => quotient + (quotient & 1),
    }
}

/// Compute a quote without failing on tolerance
///
/// Reserve exhaustion, an inconsistent baseline and fee overflow still fail;
/// tolerance is only reported through `within_tolerance`.
pub fn simulate_swap(
    pool: &PoolState,
    reserves: Reserves,
    direction: Direction,
    amount: u64,
) -> AmmResult<Quote> {
    if amount == 0 {
        return Err(AmmError::invalid_argument("swap amount must be positive"));
    }

    let k = pool.invariant();
    let reserve_a = reserves.a as u128;
    let reserve_b = reserves.b as u128;
    let a = amount as u128;

    let (gross, invariant_after) = match direction {
        Direction::AToB => {
            let new_a = reserve_a + a;
            let numerator = (reserve_b * new_a)
                .checked_sub(k)
                .ok_or_else(|| inconsistent_baseline(k, reserves))?;
            let b = round_half_even(numerator, new_a);
            if b >= reserve_b {
                return Err(AmmError::ExceedsReserve {
                    side: 'B',
                    requested: b,
                    reserve: reserves.b,
                });
            }
            (b, new_a * (reserve_b - b))
        }
        Direction::BToA => {
            if a >= reserve_a {
                return Err(AmmError::ExceedsReserve {
                    side: 'A',
                    requested: a,
                    reserve: reserves.a,
                });
            }
            let new_a = reserve_a - a;
            let numerator = k
                .checked_sub(reserve_b * new_a)
                .ok_or_else(|| inconsistent_baseline(k, reserves))?;
            let b = round_half_even(numerator, new_a);
            (b, new_a * (reserve_b + b))
        }
    };

    let gross_amount = to_u64("gross_amount", gross)?;
    let ppm = pool.fees().total_ppm()?;
    let fee_amount = to_u64(
        "fee_amount",
        round_half_even(gross * ppm as u128, FEE_DENOMINATOR as u128),
    )?;
    let output_amount = match direction {
        Direction::AToB => gross_amount - fee_amount,
        Direction::BToA => to_u64("output_amount", gross + fee_amount as u128)?,
    };

    let drift = k.abs_diff(invariant_after);
    let tolerance = pool.tolerance();

    let quote = Quote {
        direction,
        amount,
        gross_amount,
        fee_amount,
        output_amount,
        invariant_before: k,
        invariant_after,
        drift,
        tolerance,
        within_tolerance: drift <= tolerance as u128,
    };

    debug!(
        direction = %direction,
        amount,
        gross = gross_amount,
        fee = fee_amount,
        drift = %drift,
        within_tolerance = quote.within_tolerance,
        "Simulated swap"
    );

    Ok(quote)
}

/// Compute a quote, failing with `ToleranceExceeded` when the invariant drifts
/// further than the pool allows
pub fn quote_swap(
    pool: &PoolState,
    reserves: Reserves,
    direction: Direction,
    amount: u64,
) -> AmmResult<Quote> {
    let quote = simulate_swap(pool, reserves, direction, amount)?;
    if !quote.within_tolerance {
        return Err(AmmError::ToleranceExceeded {
            drift: quote.drift,
            tolerance: quote.tolerance,
        });
    }
    Ok(quote)
}

/// One pool of a composite swap together with its live reserves
#[derive(Debug, Clone, Copy)]
pub struct SwapLeg<'a> {
    pub pool: &'a PoolState,
    pub reserves: Reserves,
}

/// Quotes of both legs of a swap routed through an intermediate asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuperSwapQuote {
    pub first: Quote,
    pub second: Quote,
    #[serde(serialize_with = "serialize_pubkey")]
    pub intermediate_mint: Pubkey,
}

impl SuperSwapQuote {
    /// Final token B of the second pool received by the user
    pub fn output_amount(&self) -> u64 {
        self.second.output_amount
    }
}

/// Quote a swap through two pools
///
/// The first leg may run in either direction. Whatever it delivers must be
/// token A of the second pool, which is then swapped A to B. Each leg is
/// checked against its own pool's tolerance.
pub fn quote_super_swap(
    first: SwapLeg<'_>,
    direction: Direction,
    second: SwapLeg<'_>,
    amount: u64,
) -> AmmResult<SuperSwapQuote> {
    let intermediate_mint = match direction {
        Direction::AToB => first.pool.mint_b(),
        Direction::BToA => first.pool.mint_a(),
    };
    if intermediate_mint != second.pool.mint_a() {
        return Err(AmmError::RouteMismatch {
            intermediate: intermediate_mint.to_string(),
            second_mint_a: second.pool.mint_a().to_string(),
        });
    }

    let first_quote = quote_swap(first.pool, first.reserves, direction, amount)?;
    let second_quote = quote_swap(
        second.pool,
        second.reserves,
        Direction::AToB,
        first_quote.delivered_amount(),
    )?;

    Ok(SuperSwapQuote {
        first: first_quote,
        second: second_quote,
        intermediate_mint,
    })
}

fn inconsistent_baseline(k: u128, reserves: Reserves) -> AmmError {
    AmmError::invalid_argument(format!(
        "invariant baseline {k} is inconsistent with reserves a={} b={}",
        reserves.a, reserves.b
    ))
}

fn to_u64(field: &'static str, value: u128) -> AmmResult<u64> {
    u64::try_from(value).map_err(|_| AmmError::FieldOverflow {
        field,
        value,
        max: u64::MAX as u128,
    })
}

fn serialize_pubkey<S: serde::Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(key)
}
