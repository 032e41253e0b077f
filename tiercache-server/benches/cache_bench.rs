use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tiercache_server::{CacheConfig, L2CacheConfig, LruStore, TieredCache};

fn bench_lru_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("lru_set");

    for capacity in [100usize, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &cap| {
            let mut lru = LruStore::new(cap);
            let mut i = 0u64;
            b.iter(|| {
                let key = format!("key{}", i % (cap as u64 * 2));
                lru.set(black_box(&key), b"value".to_vec(), 60);
                i += 1;
            });
        });
    }

    group.finish();
}

fn bench_lru_get(c: &mut Criterion) {
    let mut lru = LruStore::new(10_000);
    for i in 0..10_000 {
        lru.set(&format!("key{}", i), b"value".to_vec(), 600);
    }

    let mut i = 0u64;
    c.bench_function("lru_get_hit", |b| {
        b.iter(|| {
            let key = format!("key{}", i % 10_000);
            black_box(lru.get(&key));
            i += 1;
        });
    });
}

fn bench_tiered_get_set(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let cache = rt.block_on(async {
        TieredCache::new(CacheConfig {
            l1_max_entries: 1_000,
            l2: L2CacheConfig {
                directory: dir.path().to_path_buf(),
                max_entries: 100_000,
                queue_capacity: 64,
                ..Default::default()
            },
            ..Default::default()
        })
    });

    let mut i = 0u64;
    c.bench_function("tiered_set_then_get", |b| {
        b.iter(|| {
            let key = format!("key{}", i % 5_000);
            cache.set(&key, b"value".to_vec(), None);
            black_box(cache.get(&key));
            i += 1;
        });
    });

    let mut i = 0u64;
    c.bench_function("tiered_get_promote", |b| {
        b.iter(|| {
            // cycles past L1 capacity so most reads come from L2
            let key = format!("key{}", i % 5_000);
            black_box(cache.get(&key));
            i += 1;
        });
    });
}

criterion_group!(benches, bench_lru_set, bench_lru_get, bench_tiered_get_set);
criterion_main!(benches);
