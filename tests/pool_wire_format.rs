//! Wire-format integration tests through the public API
//!
//! Pool buffers are assembled byte by byte here, independently of the
//! library's encoder, so the offsets are checked against a second source.

use amm_client::address::{derive_seeded, find_pool_authority, pool_authority, verify_pool_authority};
use amm_client::decoder::{decode_pool, decode_pool_view};
use amm_client::filters::{AccountFilter, PoolFilter};
use amm_client::layout::AmmInstruction;
use amm_client::quote::{quote_swap, Reserves};
use amm_client::{AmmError, Direction, LayoutVersion, PoolState, PoolStatus, Pubkey};

struct RawPool {
    status: u8,
    nonce: u8,
    k_a: u64,
    k_b: u64,
    tolerance: u64,
    fees: Vec<u64>,
    addresses: Vec<Pubkey>,
}

impl RawPool {
    fn bytes(&self) -> Vec<u8> {
        let mut out = vec![self.status, self.nonce];
        out.extend_from_slice(&self.k_a.to_le_bytes());
        out.extend_from_slice(&self.k_b.to_le_bytes());
        out.extend_from_slice(&self.tolerance.to_le_bytes());
        for fee in &self.fees {
            out.extend_from_slice(&fee.to_le_bytes());
        }
        for address in &self.addresses {
            out.extend_from_slice(address.as_ref());
        }
        out
    }
}

fn keys(n: usize) -> Vec<Pubkey> {
    (0..n).map(|_| Pubkey::new_unique()).collect()
}

#[test]
fn decodes_hand_built_single_fee_pool() {
    let addresses = keys(6);
    let raw = RawPool {
        status: 1,
        nonce: 254,
        k_a: 1_000,
        k_b: 2_000,
        tolerance: 200,
        fees: vec![2_500],
        addresses: addresses.clone(),
    };
    let bytes = raw.bytes();
    assert_eq!(bytes.len(), 226);

    let state = decode_pool(&bytes).unwrap();
    assert_eq!(state.version(), LayoutVersion::SingleFee);
    assert_eq!(state.status(), PoolStatus::Active);
    assert_eq!(state.nonce(), 254);
    assert_eq!(state.invariant(), 2_000_000);
    assert_eq!(state.owner(), addresses[0]);
    assert_eq!(state.mint_a(), addresses[1]);
    assert_eq!(state.mint_b(), addresses[2]);
    assert_eq!(state.vault_a(), addresses[3]);
    assert_eq!(state.vault_b(), addresses[4]);
    assert_eq!(state.fee_vault(), addresses[5]);
    assert_eq!(state.encode().unwrap(), bytes);

    let view = decode_pool_view(&bytes).unwrap();
    assert_eq!(view.fees, vec![0.0025]);
    assert_eq!(view.mint_b, addresses[2].to_string());
    assert!(view.fee_mint.is_none());
}

#[test]
fn decodes_hand_built_tiered_pool() {
    let addresses = keys(12);
    let raw = RawPool {
        status: 2,
        nonce: 251,
        k_a: 5,
        k_b: 7,
        tolerance: 0,
        fees: vec![100, 200, 300, 400, 500],
        addresses: addresses.clone(),
    };
    let bytes = raw.bytes();
    assert_eq!(bytes.len(), 450);

    let state = decode_pool(&bytes).unwrap();
    assert_eq!(state.version(), LayoutVersion::TieredFee);
    assert_eq!(state.status(), PoolStatus::Paused);
    assert_eq!(state.fee_receivers(), &addresses[6..11]);
    assert_eq!(state.fee_mint(), addresses[11]);
    assert_eq!(state.encode().unwrap(), bytes);

    let view = decode_pool_view(&bytes).unwrap();
    assert_eq!(view.fees.len(), 5);
    assert!((view.total_fee - 0.0015).abs() < 1e-12);
}

#[test]
fn rejects_unknown_lengths_and_status() {
    assert_eq!(
        decode_pool(&[0u8; 202]).unwrap_err(),
        AmmError::UnknownLayout { len: 202 }
    );

    let raw = RawPool {
        status: 9,
        nonce: 0,
        k_a: 0,
        k_b: 0,
        tolerance: 0,
        fees: vec![0],
        addresses: keys(6),
    };
    assert!(matches!(
        decode_pool(&raw.bytes()),
        Err(AmmError::InvalidEnumValue { field: "status", value: 9 })
    ));
}

#[test]
fn authority_round_trip() {
    let program = Pubkey::new_unique();
    let pool = Pubkey::new_unique();
    let (authority, nonce) = find_pool_authority(&pool, &program).unwrap();

    assert_eq!(
        (authority, nonce),
        Pubkey::find_program_address(&[pool.as_ref()], &program)
    );
    assert_eq!(pool_authority(&pool, nonce, &program).unwrap(), authority);
    assert!(verify_pool_authority(&pool, nonce, &authority, &program).is_ok());
    assert!(verify_pool_authority(&pool, nonce, &Pubkey::new_unique(), &program).is_err());
}

#[test]
fn seeded_pool_address_matches_sdk() {
    let owner = Pubkey::new_unique();
    let program = Pubkey::new_unique();
    let seed = "AMM1700000000000";
    assert_eq!(
        derive_seeded(&owner, seed, &program).unwrap(),
        Pubkey::create_with_seed(&owner, seed, &program).unwrap()
    );
    assert!(matches!(
        derive_seeded(&owner, &"x".repeat(33), &program),
        Err(AmmError::InvalidSeed(_))
    ));
}

#[test]
fn discovery_filters_match_layout_offsets() {
    let owner = Pubkey::new_unique();
    let filters = PoolFilter::by_owner(LayoutVersion::TieredFee, owner).account_filters();
    assert_eq!(
        filters,
        vec![
            AccountFilter::DataSize(450),
            AccountFilter::Memcmp {
                offset: 66,
                bytes: owner.to_bytes().to_vec()
            },
        ]
    );
}

#[test]
fn quote_from_decoded_pool() {
    let raw = RawPool {
        status: 1,
        nonce: 255,
        k_a: 1_000,
        k_b: 2_000,
        tolerance: 200,
        fees: vec![0],
        addresses: keys(6),
    };
    let state: PoolState = decode_pool(&raw.bytes()).unwrap();
    let quote = quote_swap(&state, Reserves::new(1_000, 2_000), Direction::AToB, 100).unwrap();
    assert_eq!(quote.output_amount, 182);
    assert_eq!(quote.invariant_after, 1_999_800);

    let swap = AmmInstruction::Swap {
        amount: quote.amount,
        direction: quote.direction,
    };
    assert_eq!(swap.pack().unwrap(), [10u8, 100, 0, 0, 0, 0, 0, 0, 0, 1]);
}
