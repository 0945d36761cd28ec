#![allow(dead_code)]

use application::behavior_log::{BehaviorLogSettings, BehaviorLogSink};
use application::cache::{CacheBackend, KeySpace};
use application::command::behavior::{BehaviorRecorder, ToggleCmd};
use application::command::counter_writer::CounterWriter;
use application::command::policy::CounterPolicy;
use application::command::video::VideoStatService;
use application::context::AppContext;
use application::flush::reconcile::Reconciler;
use application::flush::scheduler::BufferFlushScheduler;
use application::query::hydration::ReadHydration;
use application::store::{
    CounterStore, DeltaBuffer, InteractionStateStore, MembershipTtl, RelationLookup,
    SnapshotLoader,
};
use domain::interaction::RelationKind;
use domain::value::UserId;
use infra::event_bus::in_memory::InMemoryEventBus;
use infra::repository::in_memory::{
    InMemoryBehaviorLogRepository, InMemoryCommentRepository, InMemoryInteractionRepository,
    InMemoryStatRepository,
};
use infra::{InMemoryCache, SnowflakeIdGenerator};
use std::sync::Arc;
use std::time::Duration;

pub const PREFIX: &str = "test";

/// 用内存缓存与内存仓储拼起来的完整写读链路
pub struct Harness {
    pub cache: InMemoryCache,
    pub keys: KeySpace,
    pub stats: InMemoryStatRepository,
    pub interactions: InMemoryInteractionRepository,
    pub comments: InMemoryCommentRepository,
    pub logs: InMemoryBehaviorLogRepository,
    pub counters: CounterStore,
    pub buffer: DeltaBuffer,
    pub loader: SnapshotLoader,
    pub lookup: RelationLookup,
    pub sink: Arc<BehaviorLogSink>,
    pub recorder: BehaviorRecorder<InMemoryEventBus>,
    pub hydration: ReadHydration,
    pub scheduler: Arc<BufferFlushScheduler>,
    pub reconciler: Reconciler,
    pub videos: VideoStatService,
    pub ctx: AppContext,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(CounterPolicy::default())
    }

    pub fn with_policy(policy: CounterPolicy) -> Self {
        Self::build(policy, InMemoryEventBus::new_async())
    }

    pub fn build(policy: CounterPolicy, bus: InMemoryEventBus) -> Self {
        let cache = InMemoryCache::new();
        let backend: Arc<dyn CacheBackend> = Arc::new(cache.clone());
        let keys = KeySpace::new(PREFIX);

        let stats = InMemoryStatRepository::new();
        let interactions = InMemoryInteractionRepository::new();
        let comments = InMemoryCommentRepository::new(Arc::new(stats.clone()));
        let logs = InMemoryBehaviorLogRepository::new();

        let counters = CounterStore::new(backend.clone(), keys.clone(), Duration::from_secs(3600));
        let buffer = DeltaBuffer::new(backend.clone(), keys.clone(), Duration::from_secs(600));
        let loader = SnapshotLoader::new(Arc::new(stats.clone()), counters.clone(), buffer.clone());
        let membership =
            InteractionStateStore::new(backend.clone(), keys.clone(), MembershipTtl::default());
        let lookup = RelationLookup::new(membership, Arc::new(interactions.clone()));

        let sink = BehaviorLogSink::start(
            Arc::new(logs.clone()),
            BehaviorLogSettings {
                queue_capacity: 1024,
                workers: 1,
                batch_size: 16,
            },
        );
        let writer = CounterWriter::new(
            counters.clone(),
            buffer.clone(),
            loader.clone(),
            Arc::new(stats.clone()),
            policy,
        );
        let recorder = BehaviorRecorder::new(
            Arc::new(interactions.clone()),
            Arc::new(comments.clone()),
            writer,
            lookup.clone(),
            sink.clone(),
            Arc::new(SnowflakeIdGenerator::new(1).expect("valid node id")),
            Arc::new(bus),
        );
        let hydration = ReadHydration::new(counters.clone(), loader.clone(), lookup.clone());
        let scheduler = BufferFlushScheduler::new(
            buffer.clone(),
            Arc::new(stats.clone()),
            Duration::from_millis(20),
        );
        let reconciler = Reconciler::new(
            scheduler.clone(),
            Arc::new(interactions.clone()),
            Arc::new(stats.clone()),
            counters.clone(),
        );
        let videos = VideoStatService::new(Arc::new(stats.clone()), loader.clone());

        Self {
            cache,
            keys,
            stats,
            interactions,
            comments,
            logs,
            counters,
            buffer,
            loader,
            lookup,
            sink,
            recorder,
            hydration,
            scheduler,
            reconciler,
            videos,
            ctx: AppContext::new(),
        }
    }

    pub async fn like(&self, user: i64, video: i64) {
        self.recorder
            .toggle_on(&self.ctx, toggle(user, RelationKind::Like, video))
            .await
            .expect("like succeeds");
    }

    pub async fn unlike(&self, user: i64, video: i64) {
        self.recorder
            .toggle_off(&self.ctx, toggle(user, RelationKind::Like, video))
            .await
            .expect("unlike succeeds");
    }
}

pub fn toggle(user: i64, kind: RelationKind, target: i64) -> ToggleCmd {
    ToggleCmd {
        user_id: UserId::from(user),
        kind,
        target_id: target,
    }
}
