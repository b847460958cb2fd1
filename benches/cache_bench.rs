//! Benchmarks for the reach-scoped cache.

use std::sync::Once;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use blob_cache_tier::{CacheRecord, Reach, ScopedCacheRegistry, SingleScopeCache};

/// Route the cache's tracing output through the usual env filter. Warn by
/// default so per-eviction debug logs do not skew the timings.
fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "blob_cache_tier=warn".into()),
            )
            .with_target(true)
            .init();
    });
}

fn record(i: usize, now: u64) -> CacheRecord {
    let mut r = CacheRecord::new(format!("hash-{i}"), 1_024, Reach::Commons, now);
    r.proximity_score = (i % 200) as i32 - 100;
    r
}

fn bench_put_with_eviction(c: &mut Criterion) {
    init_tracing();
    c.bench_function("put_churn_10k_over_1k_capacity", |b| {
        b.iter(|| {
            // Capacity holds ~1k records, so ~9k inserts evict.
            let mut cache = SingleScopeCache::new(1_024 * 1_024);
            for i in 0..10_000 {
                cache.put(black_box(record(i, i as u64)), i as u64).unwrap();
            }
            black_box(cache.stats())
        })
    });
}

fn bench_hot_get(c: &mut Criterion) {
    init_tracing();
    let mut cache = SingleScopeCache::new(64 * 1024 * 1024);
    for i in 0..10_000 {
        cache.put(record(i, 0), 0).unwrap();
    }

    let mut t = 1;
    c.bench_function("get_hit_10k_entries", |b| {
        b.iter(|| {
            t += 1;
            black_box(cache.get(black_box("hash-5000"), t))
        })
    });
}

fn bench_expiry_sweep(c: &mut Criterion) {
    init_tracing();
    c.bench_function("sweep_100_expired_of_10k", |b| {
        b.iter(|| {
            let mut cache = SingleScopeCache::new(64 * 1024 * 1024);
            // 100 old records among 9,900 fresh ones.
            for i in 0..100 {
                cache.put(record(i, 0), 0).unwrap();
            }
            for i in 100..10_000 {
                cache.put(record(i, 1_000_000), 1_000_000).unwrap();
            }
            let removed = cache.cleanup_expired(1_010_000, 500_000);
            assert_eq!(removed.len(), 100);
            black_box(removed)
        })
    });
}

fn bench_registry_put(c: &mut Criterion) {
    init_tracing();
    c.bench_function("registry_put_indexed", |b| {
        b.iter(|| {
            let registry = ScopedCacheRegistry::with_uniform_capacity(64 * 1024 * 1024);
            for i in 0..1_000 {
                let r = record(i, 0)
                    .with_categories("protocol", "governance")
                    .with_replica_holder(format!("peer-{}", i % 16));
                registry.put(black_box(r)).unwrap();
            }
            black_box(registry.global_stats())
        })
    });
}

criterion_group!(
    benches,
    bench_put_with_eviction,
    bench_hot_get,
    bench_expiry_sweep,
    bench_registry_put
);
criterion_main!(benches);
