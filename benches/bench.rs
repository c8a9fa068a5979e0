// Criterion benchmarks for Lume Bond

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lume_bond::config::MatchingSettings;
use lume_bond::core::{apply_transition, MatchingEngine, UserLockRegistry};
use lume_bond::models::{ArchiveReason, Direction, Match, MatchState, UserId};
use lume_bond::services::MemoryStorage;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

fn bench_apply_transition(c: &mut Criterion) {
    let a = UserId::from_u128(1);
    let b = UserId::from_u128(2);
    let active = Match::new(a, b, Utc::now());
    let now = Utc::now();

    c.bench_function("apply_transition_active_to_blocked", |bench| {
        bench.iter(|| {
            apply_transition(
                black_box(&active),
                black_box(MatchState::Blocked),
                a,
                Some(ArchiveReason::Block),
                now,
            )
        });
    });
}

fn bench_pair_lock(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let locks = UserLockRegistry::new(Duration::from_secs(5));
    let a = UserId::from_u128(1);
    let b = UserId::from_u128(2);

    c.bench_function("pair_lock_acquire_release", |bench| {
        bench.iter(|| {
            rt.block_on(async {
                let guard = locks.acquire_pair(black_box(a), black_box(b)).await.unwrap();
                drop(guard);
            })
        });
    });
}

fn bench_mutual_likes(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("mutual_likes");

    for pairs in [10u128, 100, 500] {
        group.bench_with_input(BenchmarkId::from_parameter(pairs), &pairs, |bench, &pairs| {
            bench.iter(|| {
                let settings = MatchingSettings::default();
                let engine = MatchingEngine::new(
                    Arc::new(MemoryStorage::new()),
                    UserLockRegistry::new(settings.lock_timeout()),
                    settings,
                );
                rt.block_on(async {
                    for n in 0..pairs {
                        let a = UserId::from_u128(n * 2 + 1);
                        let b = UserId::from_u128(n * 2 + 2);
                        engine.record_swipe(a, b, Direction::Like).await.unwrap();
                        let result = engine.record_swipe(b, a, Direction::Like).await.unwrap();
                        black_box(result);
                    }
                })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_apply_transition, bench_pair_lock, bench_mutual_likes);

criterion_main!(benches);
