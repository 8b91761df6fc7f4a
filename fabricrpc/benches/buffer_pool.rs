//! Buffer pool benchmarks for fabricrpc
//!
//! Measures lease and release cost, single and paired, and the cost of
//! contended acquisition across tasks.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use fabricrpc::buffer::BufferPool;
use std::hint::black_box;

fn bench_acquire_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_pool");

    for piece_size in [256usize, 4096, 65536] {
        let pool = BufferPool::new(8, piece_size);
        group.bench_with_input(
            BenchmarkId::new("acquire_one", piece_size),
            &pool,
            |b, pool| {
                b.iter(|| {
                    let lease = pool.acquire_one().unwrap();
                    pool.release_one(black_box(lease));
                });
            },
        );
        group.bench_with_input(
            BenchmarkId::new("acquire_pair", piece_size),
            &pool,
            |b, pool| {
                b.iter(|| {
                    let (first, second) = pool.acquire_pair().unwrap();
                    pool.release_one(black_box(first));
                    pool.release_one(black_box(second));
                });
            },
        );
    }

    group.finish();
}

fn bench_contended_acquire(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let pool = BufferPool::new(4, 4096);

    c.bench_function("buffer_pool/contended_8_tasks", |b| {
        b.to_async(&rt).iter(|| {
            let pool = pool.clone();
            async move {
                let mut tasks = tokio::task::JoinSet::new();
                for _ in 0..8 {
                    let pool = pool.clone();
                    tasks.spawn(async move {
                        let lease = pool.acquire().await;
                        tokio::task::yield_now().await;
                        pool.release_one(lease);
                    });
                }
                while let Some(joined) = tasks.join_next().await {
                    joined.unwrap();
                }
            }
        });
    });
}

criterion_group!(benches, bench_acquire_release, bench_contended_acquire);
criterion_main!(benches);
