mod common;

use application::cache::{CacheBackend, KeySpace};
use application::command::behavior::PlayCmd;
use application::command::policy::CounterPolicy;
use application::error::AppError;
use application::event::handler::interaction::registry::register_handlers;
use application::flush::{BufferFlushScheduler, Reconciler};
use application::query::{AnalysisQuery, HistoryQuery};
use application::store::{CounterStore, DeltaBuffer, SnapshotLoader};
use async_trait::async_trait;
use common::{Harness, PREFIX};
use domain::behavior::BehaviorType;
use domain::counter::{CounterError, CounterKind, CounterSnapshot, StatRepository, TargetScope};
use domain::interaction::{Interaction, InteractionError, InteractionRepository, RelationKind};
use domain::value::{UserId, VideoId};
use infra::event_bus::in_memory::InMemoryEventBus;
use infra::repository::in_memory::{InMemoryInteractionRepository, InMemoryStatRepository};
use infra::InMemoryCache;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn play(h: &Harness, user: i64, video: i64) {
    h.recorder
        .play(
            &h.ctx,
            PlayCmd {
                video_id: VideoId::from(video),
                user_id: UserId::from(user),
            },
        )
        .await
        .unwrap();
}

/// 包一层计数仓储，在持久层调用前后插入额外动作
struct HookedStats {
    inner: InMemoryStatRepository,
    // 合并时让缓存一并失联
    outage_on_apply: Option<InMemoryCache>,
    // 读到持久行之后立刻刷一轮
    flush_after_find: Option<(Arc<BufferFlushScheduler>, AtomicBool)>,
}

impl HookedStats {
    fn new(inner: InMemoryStatRepository) -> Self {
        Self {
            inner,
            outage_on_apply: None,
            flush_after_find: None,
        }
    }
}

#[async_trait]
impl StatRepository for HookedStats {
    async fn create(&self, scope: TargetScope, target_id: i64) -> Result<(), CounterError> {
        self.inner.create(scope, target_id).await
    }

    async fn find(
        &self,
        scope: TargetScope,
        target_id: i64,
    ) -> Result<Option<CounterSnapshot>, CounterError> {
        let row = self.inner.find(scope, target_id).await?;
        if let Some((scheduler, armed)) = &self.flush_after_find {
            if armed.swap(false, Ordering::SeqCst) {
                scheduler
                    .flush_once(CounterKind::Like)
                    .await
                    .map_err(|e| CounterError::DbErr(e.to_string()))?;
            }
        }
        Ok(row)
    }

    async fn find_many(
        &self,
        scope: TargetScope,
        target_ids: &[i64],
    ) -> Result<Vec<CounterSnapshot>, CounterError> {
        self.inner.find_many(scope, target_ids).await
    }

    async fn increment(
        &self,
        kind: CounterKind,
        target_id: i64,
        delta: i64,
    ) -> Result<(), CounterError> {
        self.inner.increment(kind, target_id, delta).await
    }

    async fn apply_deltas(
        &self,
        kind: CounterKind,
        deltas: &[(i64, i64)],
    ) -> Result<u64, CounterError> {
        if let Some(cache) = &self.outage_on_apply {
            cache.set_unavailable(true);
            return Err(CounterError::DbErr("connection reset".to_string()));
        }
        self.inner.apply_deltas(kind, deltas).await
    }

    async fn overwrite(
        &self,
        kind: CounterKind,
        target_id: i64,
        value: i64,
    ) -> Result<(), CounterError> {
        self.inner.overwrite(kind, target_id, value).await
    }
}

/// 重算关系行时恰好落下一次新的点赞：关系行已写入，增量还在缓冲区
struct LikeDuringRecount {
    inner: InMemoryInteractionRepository,
    buffer: DeltaBuffer,
}

#[async_trait]
impl InteractionRepository for LikeDuringRecount {
    async fn insert(&self, interaction: &Interaction) -> Result<bool, InteractionError> {
        self.inner.insert(interaction).await
    }

    async fn delete(
        &self,
        user_id: UserId,
        kind: RelationKind,
        target_id: i64,
    ) -> Result<bool, InteractionError> {
        self.inner.delete(user_id, kind, target_id).await
    }

    async fn exists(
        &self,
        user_id: UserId,
        kind: RelationKind,
        target_id: i64,
    ) -> Result<bool, InteractionError> {
        self.inner.exists(user_id, kind, target_id).await
    }

    async fn targets_of(
        &self,
        user_id: UserId,
        kind: RelationKind,
    ) -> Result<Vec<i64>, InteractionError> {
        self.inner.targets_of(user_id, kind).await
    }

    async fn count_by_targets(
        &self,
        kind: RelationKind,
        target_ids: &[i64],
    ) -> Result<HashMap<i64, i64>, InteractionError> {
        let target = target_ids[0];
        self.inner
            .insert(&Interaction::new(UserId::from(99), kind, target)?)
            .await?;
        self.buffer
            .accumulate(CounterKind::Like, target, 1)
            .await
            .expect("buffer write succeeds");
        self.inner.count_by_targets(kind, target_ids).await
    }
}

#[tokio::test]
async fn test_failed_flush_restores_deltas_for_next_cycle() {
    let h = Harness::new();
    for _ in 0..4 {
        play(&h, 1, 90).await;
    }

    h.stats.set_failing(true);
    let err = h.scheduler.flush_once(CounterKind::Play).await.unwrap_err();
    assert!(matches!(err, AppError::FlushError(_)));
    assert_eq!(h.buffer.pending(CounterKind::Play, 90).await.unwrap(), 4);
    assert_eq!(h.stats.value(CounterKind::Play, 90), 0);

    // 失败期间新增的计数与恢复的增量合并
    play(&h, 2, 90).await;
    h.stats.set_failing(false);
    let report = h.scheduler.flush_once(CounterKind::Play).await.unwrap();
    assert_eq!(report.net_delta, 5);
    assert_eq!(h.stats.value(CounterKind::Play, 90), 5);
    assert_eq!(h.buffer.pending(CounterKind::Play, 90).await.unwrap(), 0);
    assert!(h
        .cache
        .keys_with_prefix(&h.keys.buffer(CounterKind::Play))
        .iter()
        .all(|k| !k.contains("flushing")));
}

#[tokio::test]
async fn test_kinds_flush_independently() {
    let h = Harness::new();
    play(&h, 1, 3).await;
    h.like(1, 3).await;

    let report = h.scheduler.flush_once(CounterKind::Like).await.unwrap();
    assert_eq!(report.targets, 1);
    assert_eq!(h.stats.value(CounterKind::Like, 3), 1);
    assert_eq!(h.stats.value(CounterKind::Play, 3), 0);
    assert_eq!(h.buffer.pending(CounterKind::Play, 3).await.unwrap(), 1);

    let empty = h.scheduler.flush_once(CounterKind::Like).await.unwrap();
    assert_eq!(empty.targets, 0);
    assert_eq!(h.stats.batches(), 1);
}

#[tokio::test]
async fn test_scheduler_loop_and_final_flush_on_shutdown() {
    let h = Harness::new();
    h.scheduler.start();
    for user in 1..=5 {
        play(&h, user, 12).await;
    }
    h.like(1, 12).await;
    h.scheduler.shutdown().await;

    assert_eq!(h.stats.value(CounterKind::Play, 12), 5);
    assert_eq!(h.stats.value(CounterKind::Like, 12), 1);
    assert_eq!(h.buffer.pending(CounterKind::Play, 12).await.unwrap(), 0);
}

#[tokio::test]
async fn test_reconcile_repairs_drifted_counts() {
    let h = Harness::new();
    for user in 1..=3 {
        h.interactions
            .insert(&Interaction::new(UserId::from(user), RelationKind::Like, 60).unwrap())
            .await
            .unwrap();
    }
    h.stats.overwrite(CounterKind::Like, 60, 50).await.unwrap();
    h.hydration.video(None, VideoId::from(60)).await.unwrap();

    let fixed = h
        .reconciler
        .reconcile(CounterKind::Like, &[60, 61])
        .await
        .unwrap();
    assert_eq!(fixed, 1);
    assert_eq!(h.stats.value(CounterKind::Like, 60), 3);
    assert!(!h.cache.contains_key(&h.keys.snapshot(TargetScope::Video, 60)));

    let view = h.hydration.video(None, VideoId::from(60)).await.unwrap();
    assert_eq!(view.like_count, 3);

    let err = h
        .reconciler
        .reconcile(CounterKind::Play, &[60])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_history_and_totals_after_flush() {
    let h = Harness::new();
    for video in [1, 2, 1, 3] {
        play(&h, 8, video).await;
    }
    h.like(8, 2).await;
    h.sink.shutdown().await;
    assert_eq!(h.sink.written(), 5);
    assert_eq!(h.sink.dropped(), 0);

    let history = HistoryQuery::new(Arc::new(h.logs.clone()));
    let page = history
        .recent(UserId::from(8), BehaviorType::Play, 1, 2)
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.video_ids, vec![3, 1]);
    let last = history
        .recent(UserId::from(8), BehaviorType::Play, 2, 2)
        .await
        .unwrap();
    assert_eq!(last.video_ids, vec![2]);
    let likes = history
        .recent(UserId::from(8), BehaviorType::Like, 1, 10)
        .await
        .unwrap();
    assert_eq!(likes.video_ids, vec![2]);

    h.scheduler.flush_all().await;
    let totals = AnalysisQuery::new(Arc::new(h.stats.clone()))
        .totals()
        .await
        .unwrap();
    assert_eq!(totals.play_count, 4);
    assert_eq!(totals.like_count, 1);
}

#[tokio::test]
async fn test_registered_video_is_prewarmed_and_events_published() {
    let mut bus = InMemoryEventBus::new();
    let handler = register_handlers(&mut bus).await;
    let h = Harness::build(CounterPolicy::default(), bus);

    h.videos.register_video(VideoId::from(500)).await.unwrap();
    assert!(h
        .stats
        .find(TargetScope::Video, 500)
        .await
        .unwrap()
        .is_some());
    assert!(h
        .cache
        .contains_key(&h.keys.snapshot(TargetScope::Video, 500)));

    play(&h, 1, 500).await;
    h.like(1, 500).await;
    h.like(1, 500).await;
    assert_eq!(handler.handled(), 2);
}

#[tokio::test]
async fn test_claim_stranded_by_cache_outage_expires() {
    let cache = InMemoryCache::new();
    let keys = KeySpace::new(PREFIX);
    let buffer = DeltaBuffer::new(
        Arc::new(cache.clone()),
        keys.clone(),
        Duration::from_millis(50),
    );
    let mut stats = HookedStats::new(InMemoryStatRepository::new());
    stats.outage_on_apply = Some(cache.clone());
    let scheduler =
        BufferFlushScheduler::new(buffer.clone(), Arc::new(stats), Duration::from_secs(60));

    buffer.accumulate(CounterKind::Like, 5, 5).await.unwrap();
    let err = scheduler.flush_once(CounterKind::Like).await.unwrap_err();
    assert!(matches!(err, AppError::FlushError(_)));
    cache.set_unavailable(false);

    // 并回失败，临时键与栅栏都带着过期时间
    assert!(cache
        .keys_with_prefix(&keys.buffer(CounterKind::Like))
        .iter()
        .any(|k| k.contains("flushing")));
    assert_eq!(buffer.fences(&[CounterKind::Like]).await.unwrap(), vec![1]);
    buffer.accumulate(CounterKind::Like, 5, 1).await.unwrap();
    assert!(buffer.claim(CounterKind::Like).await.unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(cache
        .keys_with_prefix(&keys.buffer(CounterKind::Like))
        .iter()
        .all(|k| !k.contains("flushing") && !k.ends_with(":fence")));
    let claimed = buffer.claim(CounterKind::Like).await.unwrap().unwrap();
    assert_eq!(claimed.deltas, vec![(5, 1)]);
}

#[tokio::test]
async fn test_rebuild_racing_flush_does_not_cache_stale_snapshot() {
    let cache: Arc<dyn CacheBackend> = Arc::new(InMemoryCache::new());
    let keys = KeySpace::new(PREFIX);
    let stats = InMemoryStatRepository::new();
    let counters = CounterStore::new(cache.clone(), keys.clone(), Duration::from_secs(3600));
    let buffer = DeltaBuffer::new(cache, keys, Duration::from_secs(600));
    let scheduler = BufferFlushScheduler::new(
        buffer.clone(),
        Arc::new(stats.clone()),
        Duration::from_secs(60),
    );
    let mut hooked = HookedStats::new(stats.clone());
    hooked.flush_after_find = Some((scheduler.clone(), AtomicBool::new(true)));
    let loader = SnapshotLoader::new(Arc::new(hooked), counters.clone(), buffer.clone());

    stats.overwrite(CounterKind::Like, 80, 10).await.unwrap();
    buffer.accumulate(CounterKind::Like, 80, 3).await.unwrap();

    let snapshot = loader.load(TargetScope::Video, 80).await.unwrap();
    assert_eq!(snapshot.get(CounterKind::Like), 13);
    assert_eq!(stats.value(CounterKind::Like, 80), 13);
    let cached = counters.read(TargetScope::Video, 80).await.unwrap().unwrap();
    assert_eq!(cached.get(CounterKind::Like), 13);

    // 之后的刷盘与回源都不再改变结果
    scheduler.flush_once(CounterKind::Like).await.unwrap();
    let cached = counters.read(TargetScope::Video, 80).await.unwrap().unwrap();
    assert_eq!(cached.get(CounterKind::Like), stats.value(CounterKind::Like, 80));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_plays_racing_flush_cycles_are_merged_exactly_once() {
    let h = Arc::new(Harness::new());
    let videos = [13i64, 14, 15];
    for video in videos {
        h.videos.register_video(VideoId::from(video)).await.unwrap();
    }

    let stop = Arc::new(AtomicBool::new(false));
    let flusher = {
        let h = h.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            let mut merged = 0i64;
            while !stop.load(Ordering::SeqCst) {
                merged += h.scheduler.flush_once(CounterKind::Play).await.unwrap().net_delta;
                tokio::task::yield_now().await;
            }
            merged
        })
    };

    let tasks: Vec<_> = (0..400i64)
        .map(|i| {
            let h = h.clone();
            tokio::spawn(async move { play(&h, i % 7 + 1, 13 + i % 3).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }
    stop.store(true, Ordering::SeqCst);
    let merged = flusher.await.unwrap();
    let last = h.scheduler.flush_once(CounterKind::Play).await.unwrap();

    assert_eq!(merged + last.net_delta, 400);
    let durable: i64 = videos
        .iter()
        .map(|v| h.stats.value(CounterKind::Play, *v))
        .sum();
    assert_eq!(durable, 400);
    for video in videos {
        assert_eq!(h.buffer.pending(CounterKind::Play, video).await.unwrap(), 0);
        let view = h.hydration.video(None, VideoId::from(video)).await.unwrap();
        assert_eq!(view.play_count, h.stats.value(CounterKind::Play, video));
    }
}

#[tokio::test]
async fn test_reconcile_leaves_like_landing_during_recount_to_next_flush() {
    let h = Harness::new();
    h.like(1, 60).await;
    h.like(2, 60).await;
    let reconciler = Reconciler::new(
        h.scheduler.clone(),
        Arc::new(LikeDuringRecount {
            inner: h.interactions.clone(),
            buffer: h.buffer.clone(),
        }),
        Arc::new(h.stats.clone()),
        h.counters.clone(),
    );

    let fixed = reconciler.reconcile(CounterKind::Like, &[60]).await.unwrap();
    assert_eq!(fixed, 0);
    assert_eq!(h.stats.value(CounterKind::Like, 60), 2);
    assert_eq!(h.buffer.pending(CounterKind::Like, 60).await.unwrap(), 1);

    h.scheduler.flush_once(CounterKind::Like).await.unwrap();
    assert_eq!(h.stats.value(CounterKind::Like, 60), 3);
    assert_eq!(h.interactions.len(), 3);
}

#[tokio::test]
async fn test_reregistering_video_prewarms_existing_counts() {
    let h = Harness::new();
    h.videos.register_video(VideoId::from(501)).await.unwrap();
    h.stats.overwrite(CounterKind::Like, 501, 7).await.unwrap();
    h.counters.evict(TargetScope::Video, 501).await.unwrap();

    h.videos.register_video(VideoId::from(501)).await.unwrap();
    let cached = h
        .counters
        .read(TargetScope::Video, 501)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.get(CounterKind::Like), 7);
    assert_eq!(cached.get(CounterKind::Play), 0);
}
