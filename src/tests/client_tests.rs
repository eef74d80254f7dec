//! Client workflow tests with mock collaborators

use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};
use spl_associated_token_account::get_associated_token_address_with_program_id;
use std::sync::Arc;

use crate::address::{derive_seeded, pool_authority};
use crate::client::{AmmClient, CreatePoolRequest};
use crate::config::ProgramIds;
use crate::errors::AmmError;
use crate::filters::PoolFilter;
use crate::layout::{discriminant, PoolState};
use crate::metrics::AmmMetrics;
use crate::orchestrator::Orchestrator;
use crate::test_utils::{
    accounts_with_pool, single_fee_fixture, test_program_ids, tiered_fee_fixture, MockAccounts,
    MockLedger, MockSigner,
};
use crate::types::{Direction, FeeSchedule, LayoutVersion, PoolStatus};

struct Harness {
    ids: ProgramIds,
    wallet: Pubkey,
    ledger: MockLedger,
    metrics: AmmMetrics,
    keypair: Option<Keypair>,
}

impl Harness {
    fn new() -> Self {
        let keypair = Keypair::new();
        Self {
            ids: test_program_ids(),
            wallet: keypair.pubkey(),
            ledger: MockLedger::new(),
            metrics: AmmMetrics::new().unwrap(),
            keypair: Some(keypair),
        }
    }

    fn ata(&self, mint: &Pubkey) -> Pubkey {
        get_associated_token_address_with_program_id(&self.wallet, mint, &self.ids.token)
    }

    fn client(&mut self, accounts: MockAccounts) -> AmmClient {
        let keypair = self.keypair.take().expect("one client per harness");
        let orchestrator =
            Orchestrator::new(Arc::new(self.ledger.clone()), Arc::new(MockSigner::new(keypair)));
        AmmClient::new(self.ids, Arc::new(accounts), orchestrator).with_metrics(self.metrics.clone())
    }
}

fn with_nonce(state: PoolState, nonce: u8) -> PoolState {
    match state {
        PoolState::SingleFee(mut pool) => {
            pool.nonce = nonce;
            PoolState::SingleFee(pool)
        }
        PoolState::TieredFee(mut pool) => {
            pool.nonce = nonce;
            PoolState::TieredFee(pool)
        }
    }
}

fn with_status(state: PoolState, status: PoolStatus) -> PoolState {
    match state {
        PoolState::SingleFee(mut pool) => {
            pool.status = status;
            PoolState::SingleFee(pool)
        }
        PoolState::TieredFee(mut pool) => {
            pool.status = status;
            PoolState::TieredFee(pool)
        }
    }
}

#[tokio::test]
async fn test_quote_uses_live_reserves() {
    let mut h = Harness::new();
    let (pool, state) = single_fee_fixture(&h.ids, Pubkey::new_unique());
    let client = h.client(accounts_with_pool(&h.ids, pool, &state));

    let quote = client.quote_swap(&pool, Direction::AToB, 100).await.unwrap();
    assert_eq!(quote.output_amount, 182);
    assert_eq!(quote.drift, 200);
    assert_eq!(h.metrics.quotes_total.get(), 1);
    assert_eq!(h.ledger.submission_count().await, 0);
}

#[tokio::test]
async fn test_swap_submits_single_instruction() {
    let mut h = Harness::new();
    let (pool, state) = single_fee_fixture(&h.ids, Pubkey::new_unique());
    let accounts = accounts_with_pool(&h.ids, pool, &state)
        .with_ata(&h.ids, &h.wallet, &state.mint_a(), 500)
        .with_ata(&h.ids, &h.wallet, &state.mint_b(), 0);
    let client = h.client(accounts);

    let outcome = client
        .swap(&pool, Direction::AToB, 100, Some(180))
        .await
        .unwrap();
    assert_eq!(outcome.quote.output_amount, 182);
    assert!(outcome.submission.success);

    let tx = &h.ledger.submissions().await[0];
    assert_eq!(tx.message.instructions.len(), 1);
    let ix = &tx.message.instructions[0];
    assert_eq!(ix.data[0], discriminant::SWAP);
    assert_eq!(ix.data[1..9], 100u64.to_le_bytes());

    let user_token_a = tx.message.account_keys[ix.accounts[6] as usize];
    let user_token_b = tx.message.account_keys[ix.accounts[7] as usize];
    assert_eq!(user_token_a, h.ata(&state.mint_a()));
    assert_eq!(user_token_b, h.ata(&state.mint_b()));
}

#[tokio::test]
async fn test_swap_slippage_guard() {
    let mut h = Harness::new();
    let (pool, state) = single_fee_fixture(&h.ids, Pubkey::new_unique());
    let accounts = accounts_with_pool(&h.ids, pool, &state)
        .with_ata(&h.ids, &h.wallet, &state.mint_a(), 500)
        .with_ata(&h.ids, &h.wallet, &state.mint_b(), 0);
    let client = h.client(accounts);

    let err = client
        .swap(&pool, Direction::AToB, 100, Some(200))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AmmError::SlippageExceeded {
            quoted: 182,
            limit: 200
        }
    );
    assert_eq!(h.metrics.quotes_rejected.get(), 1);
    assert_eq!(h.ledger.submission_count().await, 0);
}

#[tokio::test]
async fn test_swap_requires_token_accounts() {
    let mut h = Harness::new();
    let (pool, state) = single_fee_fixture(&h.ids, Pubkey::new_unique());
    let accounts = accounts_with_pool(&h.ids, pool, &state).with_ata(
        &h.ids,
        &h.wallet,
        &state.mint_a(),
        500,
    );
    let mint_b = state.mint_b();
    let client = h.client(accounts);

    match client.swap(&pool, Direction::AToB, 100, None).await {
        Err(AmmError::MissingTokenAccount { mint, .. }) => assert_eq!(mint, mint_b.to_string()),
        other => panic!("expected MissingTokenAccount, got {other:?}"),
    }
    assert_eq!(h.ledger.submission_count().await, 0);
}

#[tokio::test]
async fn test_swap_rejected_before_submission() {
    let mut h = Harness::new();
    let (pool, state) = single_fee_fixture(&h.ids, Pubkey::new_unique());
    let paused = with_status(state, PoolStatus::Paused);
    let (tight_pool, tight_state) = single_fee_fixture(&h.ids, Pubkey::new_unique());
    let tight_state = match tight_state {
        PoolState::SingleFee(mut pool) => {
            pool.tolerance = 100;
            PoolState::SingleFee(pool)
        }
        other => other,
    };

    let accounts = accounts_with_pool(&h.ids, pool, &paused)
        .with_pool_and_vaults(&h.ids, tight_pool, &tight_state, (1_000, 2_000));
    let client = h.client(accounts);

    assert!(matches!(
        client.swap(&pool, Direction::AToB, 100, None).await,
        Err(AmmError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.swap(&tight_pool, Direction::AToB, 100, None).await,
        Err(AmmError::ToleranceExceeded {
            drift: 200,
            tolerance: 100
        })
    ));
    assert!(matches!(
        client
            .swap(&Pubkey::new_unique(), Direction::AToB, 100, None)
            .await,
        Err(AmmError::PoolNotFound(_))
    ));
    assert_eq!(h.ledger.submission_count().await, 0);
}

#[tokio::test]
async fn test_super_swap_routes_through_intermediate() {
    let mut h = Harness::new();
    let (first, first_state) = single_fee_fixture(&h.ids, Pubkey::new_unique());
    let (second, second_state) = single_fee_fixture(&h.ids, Pubkey::new_unique());
    let second_state = match second_state {
        PoolState::SingleFee(mut pool) => {
            pool.mint_a = first_state.mint_b();
            PoolState::SingleFee(pool)
        }
        other => other,
    };

    let accounts = accounts_with_pool(&h.ids, first, &first_state)
        .with_pool_and_vaults(&h.ids, second, &second_state, (1_000, 2_000))
        .with_ata(&h.ids, &h.wallet, &first_state.mint_a(), 500)
        .with_ata(&h.ids, &h.wallet, &first_state.mint_b(), 0)
        .with_ata(&h.ids, &h.wallet, &second_state.mint_b(), 0);
    let client = h.client(accounts);

    let outcome = client
        .super_swap(&first, Direction::AToB, &second, 100, None)
        .await
        .unwrap();
    assert_eq!(outcome.quote.first.output_amount, 182);
    assert_eq!(outcome.quote.second.amount, 182);
    assert_eq!(outcome.submission.instruction_count, 2);
    assert_eq!(h.metrics.quotes_total.get(), 2);

    let tx = &h.ledger.submissions().await[0];
    assert_eq!(tx.message.instructions.len(), 2);
    assert_eq!(tx.message.instructions[1].data[1..9], 182u64.to_le_bytes());
}

#[tokio::test]
async fn test_super_swap_route_mismatch() {
    let mut h = Harness::new();
    let (first, first_state) = single_fee_fixture(&h.ids, Pubkey::new_unique());
    let (second, second_state) = single_fee_fixture(&h.ids, Pubkey::new_unique());
    let accounts = accounts_with_pool(&h.ids, first, &first_state)
        .with_pool_and_vaults(&h.ids, second, &second_state, (1_000, 2_000));
    let client = h.client(accounts);

    let err = client
        .super_swap(&first, Direction::AToB, &second, 100, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AmmError::RouteMismatch { .. }));
    assert_eq!(h.ledger.submission_count().await, 0);
}

#[tokio::test]
async fn test_stale_off_curve_nonce_surfaces_address_mismatch() {
    let mut h = Harness::new();
    let (pool, state) = single_fee_fixture(&h.ids, h.wallet);
    // Any other off-curve bump gives a well-formed but wrong authority
    let stale = (0..state.nonce())
        .rev()
        .find(|&n| pool_authority(&pool, n, &h.ids.amm).is_ok())
        .expect("a second off-curve bump exists");
    let stale_state = with_nonce(state, stale);

    let accounts = accounts_with_pool(&h.ids, pool, &state)
        .with_pool(&h.ids, pool, &stale_state)
        .with_ata(&h.ids, &h.wallet, &state.mint_a(), 500)
        .with_ata(&h.ids, &h.wallet, &state.mint_b(), 0);
    let client = h.client(accounts);

    assert!(matches!(
        client.swap(&pool, Direction::AToB, 100, None).await,
        Err(AmmError::AddressMismatch { .. })
    ));
    assert!(matches!(
        client.withdraw_fee(&pool, None).await,
        Err(AmmError::AddressMismatch { .. })
    ));
    assert!(matches!(
        client.terminate(&pool).await,
        Err(AmmError::AddressMismatch { .. })
    ));
    assert_eq!(h.ledger.submission_count().await, 0);
}

#[tokio::test]
async fn test_super_swap_checks_both_authorities() {
    let mut h = Harness::new();
    let (first, first_state) = single_fee_fixture(&h.ids, Pubkey::new_unique());
    let (second, second_state) = single_fee_fixture(&h.ids, Pubkey::new_unique());
    let second_state = match second_state {
        PoolState::SingleFee(mut pool) => {
            pool.mint_a = first_state.mint_b();
            PoolState::SingleFee(pool)
        }
        other => other,
    };
    let stale = (0..second_state.nonce())
        .rev()
        .find(|&n| pool_authority(&second, n, &h.ids.amm).is_ok())
        .expect("a second off-curve bump exists");

    let accounts = accounts_with_pool(&h.ids, first, &first_state)
        .with_pool_and_vaults(&h.ids, second, &second_state, (1_000, 2_000))
        .with_pool(&h.ids, second, &with_nonce(second_state, stale))
        .with_ata(&h.ids, &h.wallet, &first_state.mint_a(), 500)
        .with_ata(&h.ids, &h.wallet, &first_state.mint_b(), 0)
        .with_ata(&h.ids, &h.wallet, &second_state.mint_b(), 0);
    let client = h.client(accounts);

    assert!(matches!(
        client
            .super_swap(&first, Direction::AToB, &second, 100, None)
            .await,
        Err(AmmError::AddressMismatch { .. })
    ));
    assert_eq!(h.ledger.submission_count().await, 0);
}

#[tokio::test]
async fn test_create_pool_rejects_taken_address() {
    let mut h = Harness::new();
    let mint_a = Pubkey::new_unique();
    let mint_b = Pubkey::new_unique();
    let seed = "AMM1700000000000".to_string();
    let taken = derive_seeded(&h.wallet, &seed, &h.ids.amm).unwrap();
    let (_, existing) = single_fee_fixture(&h.ids, h.wallet);
    let accounts = MockAccounts::new()
        .with_pool(&h.ids, taken, &existing)
        .with_mint(mint_a, 6)
        .with_mint(mint_b, 6)
        .with_ata(&h.ids, &h.wallet, &mint_a, 0)
        .with_ata(&h.ids, &h.wallet, &mint_b, 0);
    let client = h.client(accounts);

    let err = client
        .create_pool(&CreatePoolRequest {
            mint_a,
            mint_b,
            amount_a: "1".to_string(),
            amount_b: "1".to_string(),
            fees: FeeSchedule::Single(0),
            tolerance: None,
            tiers: None,
            seed: Some(seed),
        })
        .await
        .unwrap_err();
    assert_eq!(err, AmmError::PoolAlreadyExists(taken.to_string()));
    assert_eq!(err.code(), "PoolAlreadyExists");
    assert_eq!(h.ledger.submission_count().await, 0);
}

#[tokio::test]
async fn test_create_pool_scales_deposits() {
    let mut h = Harness::new();
    let mint_a = Pubkey::new_unique();
    let mint_b = Pubkey::new_unique();
    let accounts = MockAccounts::new()
        .with_mint(mint_a, 6)
        .with_mint(mint_b, 9)
        .with_ata(&h.ids, &h.wallet, &mint_a, 10_000_000)
        .with_ata(&h.ids, &h.wallet, &mint_b, 10_000_000_000);
    let client = h.client(accounts).with_seed_prefix("TEST");

    let outcome = client
        .create_pool(&CreatePoolRequest {
            mint_a,
            mint_b,
            amount_a: "1.5".to_string(),
            amount_b: "2".to_string(),
            fees: FeeSchedule::Single(3_000),
            tolerance: None,
            tiers: None,
            seed: None,
        })
        .await
        .unwrap();

    assert!(outcome.seed.starts_with("TEST"));
    assert_eq!(
        outcome.pool,
        derive_seeded(&h.wallet, &outcome.seed, &h.ids.amm).unwrap()
    );

    let tx = &h.ledger.submissions().await[0];
    assert_eq!(tx.message.instructions.len(), 8);
    assert_eq!(tx.signatures.len(), 4);
    let init = &tx.message.instructions[7].data;
    assert_eq!(init[0], discriminant::INITIALIZE);
    assert_eq!(init[10..18], 1_500_000u64.to_le_bytes());
    assert_eq!(init[18..26], 2_000_000_000u64.to_le_bytes());
    assert_eq!(init[26..34], 1_000u64.to_le_bytes());
}

#[tokio::test]
async fn test_create_pool_rejects_excess_precision() {
    let mut h = Harness::new();
    let mint_a = Pubkey::new_unique();
    let mint_b = Pubkey::new_unique();
    let accounts = MockAccounts::new()
        .with_mint(mint_a, 2)
        .with_mint(mint_b, 2)
        .with_ata(&h.ids, &h.wallet, &mint_a, 0)
        .with_ata(&h.ids, &h.wallet, &mint_b, 0);
    let client = h.client(accounts);

    let err = client
        .create_pool(&CreatePoolRequest {
            mint_a,
            mint_b,
            amount_a: "1.005".to_string(),
            amount_b: "1".to_string(),
            fees: FeeSchedule::Single(0),
            tolerance: Some(10),
            tiers: None,
            seed: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AmmError::InvalidArgument(_)));
    assert_eq!(h.ledger.submission_count().await, 0);
}

#[tokio::test]
async fn test_owner_workflows() {
    let mut h = Harness::new();
    let (pool, state) = single_fee_fixture(&h.ids, h.wallet);
    let (foreign, foreign_state) = single_fee_fixture(&h.ids, Pubkey::new_unique());
    let accounts = accounts_with_pool(&h.ids, pool, &state)
        .with_pool(&h.ids, foreign, &foreign_state)
        .with_ata(&h.ids, &h.wallet, &state.mint_a(), 0)
        .with_ata(&h.ids, &h.wallet, &state.mint_b(), 0);
    let fee_ata = h.ata(&state.fee_mint());
    let client = h.client(accounts);

    client.update_status(&pool, PoolStatus::Paused).await.unwrap();
    client.update_tolerance(&pool, 42).await.unwrap();
    client.withdraw_fee(&pool, None).await.unwrap();
    client.terminate(&pool).await.unwrap();

    let submitted = h.ledger.submissions().await;
    assert_eq!(submitted.len(), 4);
    assert_eq!(submitted[0].message.instructions[0].data, vec![2, 2]);
    assert_eq!(submitted[2].message.instructions[0].data, vec![discriminant::WITHDRAW_FEE]);
    let withdraw = &submitted[2];
    let receiver = withdraw.message.account_keys
        [withdraw.message.instructions[0].accounts[3] as usize];
    assert_eq!(receiver, fee_ata);
    assert_eq!(submitted[3].message.instructions[0].data, vec![1]);
    assert_eq!(submitted[3].message.instructions[0].accounts.len(), 9);

    assert!(matches!(
        client.terminate(&foreign).await,
        Err(AmmError::InvalidArgument(_))
    ));
    assert_eq!(h.ledger.submission_count().await, 4);
}

#[tokio::test]
async fn test_tiered_withdraw_pays_stored_receivers() {
    let mut h = Harness::new();
    let (pool, state) = tiered_fee_fixture(&h.ids, h.wallet);
    let receivers = state.fee_receivers().to_vec();
    let client = h.client(accounts_with_pool(&h.ids, pool, &state));

    client.withdraw_fee(&pool, None).await.unwrap();
    assert!(client
        .withdraw_fee(&pool, Some(Pubkey::new_unique()))
        .await
        .is_err());

    let tx = &h.ledger.submissions().await[0];
    let ix = &tx.message.instructions[0];
    let keys: Vec<Pubkey> = ix
        .accounts
        .iter()
        .map(|&i| tx.message.account_keys[i as usize])
        .collect();
    assert_eq!(&keys[3..8], receivers.as_slice());
}

#[tokio::test]
async fn test_find_pools_by_owner() {
    let mut h = Harness::new();
    let owner = Pubkey::new_unique();
    let (pool_one, state_one) = single_fee_fixture(&h.ids, owner);
    let (pool_two, state_two) = single_fee_fixture(&h.ids, owner);
    let (other_pool, other_state) = single_fee_fixture(&h.ids, Pubkey::new_unique());
    let (tiered_pool, tiered_state) = tiered_fee_fixture(&h.ids, owner);

    let accounts = MockAccounts::new()
        .with_pool(&h.ids, pool_one, &state_one)
        .with_pool(&h.ids, pool_two, &state_two)
        .with_pool(&h.ids, other_pool, &other_state)
        .with_pool(&h.ids, tiered_pool, &tiered_state);
    let client = h.client(accounts);

    let single = client
        .find_pools(&PoolFilter::by_owner(LayoutVersion::SingleFee, owner))
        .await
        .unwrap();
    let mut found: Vec<String> = single.iter().filter_map(|v| v.address.clone()).collect();
    found.sort();
    let mut expected = vec![pool_one.to_string(), pool_two.to_string()];
    expected.sort();
    assert_eq!(found, expected);

    let tiered = client
        .find_pools(&PoolFilter::by_owner(LayoutVersion::TieredFee, owner))
        .await
        .unwrap();
    assert_eq!(tiered.len(), 1);
    assert_eq!(tiered[0].fee_receivers.len(), 5);

    let everything = client
        .find_pools(&PoolFilter::all(LayoutVersion::SingleFee))
        .await
        .unwrap();
    assert_eq!(everything.len(), 3);
}
