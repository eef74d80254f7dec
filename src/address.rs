//! Deterministic address derivation
//!
//! Two derivation modes are used by the pool program:
//! - seeded addresses (`create_with_seed`) name pool accounts without a
//!   dedicated keypair
//! - program-controlled addresses are off-curve, so no private key exists for
//!   them; the pool vault authority is one of these
//!
//! The bump found when a pool is created is stored in the pool record as its
//! `nonce`. Every later instruction re-creates the authority from that stored
//! nonce and never searches again.

use solana_sdk::pubkey::{Pubkey, PubkeyError, MAX_SEEDS, MAX_SEED_LEN};
use tracing::debug;

use crate::errors::{AmmError, AmmResult};

/// Prefix of the pool account seed
pub const DEFAULT_SEED_PREFIX: &str = "AMM";

/// Parse a canonical base58 address
///
/// Rejects text that decodes to anything other than 32 bytes and text that
/// does not re-encode to itself.
pub fn parse_address(text: &str) -> AmmResult<Pubkey> {
    let invalid = |reason: &str| AmmError::InvalidAddress {
        input: text.to_string(),
        reason: reason.to_string(),
    };

    let bytes = bs58::decode(text)
        .into_vec()
        .map_err(|e| invalid(&e.to_string()))?;
    let raw: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| invalid(&format!("decoded to {} bytes, expected 32", bytes.len())))?;

    if bs58::encode(raw).into_string() != text {
        return Err(invalid("not in canonical base58 form"));
    }

    Ok(Pubkey::new_from_array(raw))
}

/// Seeded account address owned by `program`
pub fn derive_seeded(base: &Pubkey, seed: &str, program: &Pubkey) -> AmmResult<Pubkey> {
    if seed.len() > MAX_SEED_LEN {
        return Err(AmmError::InvalidSeed(format!(
            "seed '{seed}' is {} bytes, maximum is {MAX_SEED_LEN}",
            seed.len()
        )));
    }

    Pubkey::create_with_seed(base, seed, program).map_err(|e| map_pubkey_error(e, seed.as_bytes()))
}

/// Same as [`derive_seeded`] with a textual base address
pub fn derive_seeded_from_str(base: &str, seed: &str, program: &Pubkey) -> AmmResult<Pubkey> {
    derive_seeded(&parse_address(base)?, seed, program)
}

/// Program-controlled address and the first bump, searching 255 down to 0,
/// that puts it off the curve
pub fn derive_pda(seeds: &[&[u8]], program: &Pubkey) -> AmmResult<(Pubkey, u8)> {
    if seeds.len() >= MAX_SEEDS {
        return Err(AmmError::InvalidSeed(format!(
            "{} seeds given, at most {} allowed with the bump",
            seeds.len(),
            MAX_SEEDS - 1
        )));
    }
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(AmmError::InvalidSeed(format!(
            "seed of {} bytes exceeds {MAX_SEED_LEN}",
            seed.len()
        )));
    }

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = seeds.to_vec();
        with_bump.push(&bump_seed);

        match Pubkey::create_program_address(&with_bump, program) {
            Ok(address) => return Ok((address, bump)),
            Err(PubkeyError::InvalidSeeds) => continue,
            Err(e) => return Err(map_pubkey_error(e, &[])),
        }
    }

    Err(AmmError::InvalidSeed(
        "no bump in 0..=255 yields an off-curve address".to_string(),
    ))
}

/// Vault authority search for a new pool
///
/// The returned bump becomes the pool's stored nonce.
pub fn find_pool_authority(pool: &Pubkey, program: &Pubkey) -> AmmResult<(Pubkey, u8)> {
    let found = derive_pda(&[pool.as_ref()], program)?;
    debug!(pool = %pool, authority = %found.0, nonce = found.1, "Derived pool authority");
    Ok(found)
}

/// Vault authority from the stored nonce
///
/// Fails with `AddressMismatch` when the nonce does not give an off-curve
/// address for this pool.
pub fn pool_authority(pool: &Pubkey, nonce: u8, program: &Pubkey) -> AmmResult<Pubkey> {
    Pubkey::create_program_address(&[pool.as_ref(), &[nonce]], program).map_err(|_| {
        AmmError::AddressMismatch {
            context: "pool_authority",
            expected: format!("off-curve authority for pool {pool}"),
            derived: format!("nonce {nonce} yields an on-curve point"),
        }
    })
}

/// Check that `expected` is the authority the stored nonce produces
pub fn verify_pool_authority(
    pool: &Pubkey,
    nonce: u8,
    expected: &Pubkey,
    program: &Pubkey,
) -> AmmResult<()> {
    let derived = pool_authority(pool, nonce, program)?;
    if &derived != expected {
        return Err(AmmError::AddressMismatch {
            context: "pool_authority",
            expected: expected.to_string(),
            derived: derived.to_string(),
        });
    }
    Ok(())
}

/// Pool account seed: prefix followed by a millisecond timestamp
pub fn pool_seed(prefix: &str, timestamp_ms: i64) -> AmmResult<String> {
    let seed = format!("{prefix}{timestamp_ms}");
    if seed.len() > MAX_SEED_LEN {
        return Err(AmmError::InvalidSeed(format!(
            "seed '{seed}' is {} bytes, maximum is {MAX_SEED_LEN}",
            seed.len()
        )));
    }
    Ok(seed)
}

/// [`pool_seed`] stamped with the current wall-clock time
pub fn pool_seed_now(prefix: &str) -> AmmResult<String> {
    pool_seed(prefix, chrono::Utc::now().timestamp_millis())
}

fn map_pubkey_error(err: PubkeyError, seed: &[u8]) -> AmmError {
    match err {
        PubkeyError::MaxSeedLengthExceeded => {
            AmmError::InvalidSeed(format!("seed of {} bytes exceeds {MAX_SEED_LEN}", seed.len()))
        }
        PubkeyError::InvalidSeeds => AmmError::InvalidSeed("seeds give an on-curve address".into()),
        other => AmmError::InvalidSeed(other.to_string()),
    }
}
