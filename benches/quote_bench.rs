//! Benchmarks for the quote engine and the pool codec

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use amm_client::decoder::decode_pool;
use amm_client::layout::{AmmInstruction, SingleFeePool, TieredFeePool};
use amm_client::quote::{quote_super_swap, simulate_swap, Reserves, SwapLeg};
use amm_client::{Direction, PoolState, PoolStatus, Pubkey};

fn single_pool(k_a: u64, k_b: u64) -> PoolState {
    PoolState::SingleFee(SingleFeePool {
        status: PoolStatus::Active,
        nonce: 255,
        k_a,
        k_b,
        tolerance: u64::MAX,
        fee: 2_500,
        owner: Pubkey::new_unique(),
        mint_a: Pubkey::new_unique(),
        mint_b: Pubkey::new_unique(),
        vault_a: Pubkey::new_unique(),
        vault_b: Pubkey::new_unique(),
        fee_vault: Pubkey::new_unique(),
    })
}

fn tiered_pool() -> PoolState {
    PoolState::TieredFee(TieredFeePool {
        status: PoolStatus::Active,
        nonce: 254,
        k_a: 1_000_000,
        k_b: 2_000_000,
        tolerance: 1_000,
        fees: [500, 400, 300, 200, 100],
        owner: Pubkey::new_unique(),
        mint_a: Pubkey::new_unique(),
        mint_b: Pubkey::new_unique(),
        vault_a: Pubkey::new_unique(),
        vault_b: Pubkey::new_unique(),
        fee_vault: Pubkey::new_unique(),
        fee_receivers: [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ],
        fee_mint: Pubkey::new_unique(),
    })
}

fn bench_simulate_swap(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate_swap");
    let pool = single_pool(1_000_000_000, 2_000_000_000);
    let reserves = Reserves::new(1_000_000_000, 2_000_000_000);

    for amount in [1_000u64, 1_000_000, 100_000_000] {
        for direction in [Direction::AToB, Direction::BToA] {
            group.bench_with_input(
                BenchmarkId::new(direction.to_string(), amount),
                &amount,
                |b, &amount| {
                    b.iter(|| {
                        black_box(simulate_swap(
                            black_box(&pool),
                            black_box(reserves),
                            direction,
                            black_box(amount),
                        ))
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_super_swap(c: &mut Criterion) {
    let first = single_pool(1_000_000, 2_000_000);
    let second = match single_pool(2_000_000, 4_000_000) {
        PoolState::SingleFee(mut pool) => {
            pool.mint_a = first.mint_b();
            PoolState::SingleFee(pool)
        }
        other => other,
    };

    c.bench_function("quote_super_swap", |b| {
        b.iter(|| {
            black_box(quote_super_swap(
                SwapLeg {
                    pool: &first,
                    reserves: Reserves::new(1_000_000, 2_000_000),
                },
                Direction::AToB,
                SwapLeg {
                    pool: &second,
                    reserves: Reserves::new(2_000_000, 4_000_000),
                },
                black_box(10_000),
            ))
        });
    });
}

fn bench_decode_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_pool");
    let single = single_pool(1_000, 2_000).encode().unwrap_or_default();
    let tiered = tiered_pool().encode().unwrap_or_default();

    group.bench_function("single_fee", |b| {
        b.iter(|| black_box(decode_pool(black_box(&single))))
    });
    group.bench_function("tiered_fee", |b| {
        b.iter(|| black_box(decode_pool(black_box(&tiered))))
    });

    group.finish();
}

fn bench_instruction_pack(c: &mut Criterion) {
    let swap = AmmInstruction::Swap {
        amount: 1_000_000,
        direction: Direction::BToA,
    };

    c.bench_function("pack_swap", |b| b.iter(|| black_box(black_box(&swap).pack())));
}

criterion_group!(
    benches,
    bench_simulate_swap,
    bench_super_swap,
    bench_decode_pool,
    bench_instruction_pack
);
criterion_main!(benches);
