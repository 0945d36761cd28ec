use application::cache::{CacheBackend, KeySpace};
use application::command::counter_writer::CounterWriter;
use application::command::policy::CounterPolicy;
use application::query::hydration::ReadHydration;
use application::store::{
    CounterStore, DeltaBuffer, InteractionStateStore, MembershipTtl, RelationLookup,
    SnapshotLoader,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use domain::counter::CounterKind;
use domain::value::{UserId, VideoId};
use infra::repository::in_memory::{InMemoryInteractionRepository, InMemoryStatRepository};
use infra::InMemoryCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

// ============================================
// Fixture
// ============================================

struct Fixture {
    writer: CounterWriter,
    hydration: ReadHydration,
}

fn fixture() -> Fixture {
    let cache: Arc<dyn CacheBackend> = Arc::new(InMemoryCache::new());
    let keys = KeySpace::new("bench");
    let stats = Arc::new(InMemoryStatRepository::new());

    let counters = CounterStore::new(cache.clone(), keys.clone(), Duration::from_secs(3600));
    let buffer = DeltaBuffer::new(cache.clone(), keys.clone(), Duration::from_secs(600));
    let loader = SnapshotLoader::new(stats.clone(), counters.clone(), buffer.clone());
    let membership = InteractionStateStore::new(cache, keys, MembershipTtl::default());
    let lookup = RelationLookup::new(membership, Arc::new(InMemoryInteractionRepository::new()));

    Fixture {
        writer: CounterWriter::new(
            counters.clone(),
            buffer,
            loader.clone(),
            stats,
            CounterPolicy::default(),
        ),
        hydration: ReadHydration::new(counters, loader, lookup),
    }
}

// ============================================
// Benchmarks
// ============================================

fn bench_counter_apply(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let fx = fixture();
    let mut group = c.benchmark_group("counter_apply");

    for targets in [1i64, 100, 10_000] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(targets), &targets, |b, &targets| {
            let mut n = 0i64;
            b.to_async(&rt).iter(|| {
                n += 1;
                let target = n % targets;
                let writer = &fx.writer;
                async move {
                    writer
                        .apply(CounterKind::Play, black_box(target), 1)
                        .await
                        .unwrap();
                }
            });
        });
    }
    group.finish();
}

fn bench_batch_hydration(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let fx = fixture();
    let mut group = c.benchmark_group("batch_hydration");

    for size in [10usize, 50, 200] {
        let ids: Vec<VideoId> = (0..size as i64).map(VideoId::from).collect();
        rt.block_on(async {
            for id in &ids {
                fx.hydration.video(None, *id).await.unwrap();
            }
        });

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &ids, |b, ids| {
            b.to_async(&rt).iter(|| async {
                black_box(
                    fx.hydration
                        .videos(Some(UserId::from(1)), ids)
                        .await
                        .unwrap(),
                );
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_counter_apply, bench_batch_hydration);
criterion_main!(benches);
