use application::behavior_log::BehaviorLogSink;
use application::cache::{CacheBackend, KeySpace};
use application::command::behavior::BehaviorRecorder;
use application::command::counter_writer::CounterWriter;
use application::command::shared::IdGenerator;
use application::command::video::VideoStatService;
use application::event::handler::interaction::register_handlers;
use application::flush::{BufferFlushScheduler, Reconciler};
use application::query::{AnalysisQuery, HistoryQuery, ReadHydration, RelationQuery};
use application::store::{
    CounterStore, DeltaBuffer, InteractionStateStore, RelationLookup, SnapshotLoader,
};
use domain::behavior::BehaviorLogRepository;
use domain::comment::CommentRepository;
use domain::counter::StatRepository;
use domain::interaction::InteractionRepository;
use infra::config::{AppConfigImpl, CacheBackendKind};
use infra::event_bus::in_memory::InMemoryEventBus;
use infra::repository::postgres::{
    BehaviorHistoryRepositoryImpl, BehaviorLogRepositoryImpl, CommentRepositoryImpl,
    InteractionRepositoryImpl, StatAnalysisRepositoryImpl, StatRepositoryImpl,
};
use infra::{InMemoryCache, RedisCache, SnowflakeIdGenerator};
use log::info;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};
use std::sync::Arc;
use std::time::Duration;

pub struct AppState {
    pub db: DatabaseConnection,
    pub cfg: AppConfigImpl,
    pub recorder: Arc<BehaviorRecorder<InMemoryEventBus>>,
    pub hydration: ReadHydration,
    pub relations: RelationQuery,
    pub history: HistoryQuery,
    pub analysis: AnalysisQuery,
    pub videos: VideoStatService,
    pub scheduler: Arc<BufferFlushScheduler>,
    pub reconciler: Reconciler,
    pub log_sink: Arc<BehaviorLogSink>,
    pub event_bus: InMemoryEventBus,
}

impl AppState {
    pub async fn init_db(db_url: &str) -> DatabaseConnection {
        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(90)
            .min_connections(20)
            .connect_timeout(Duration::from_secs(3))
            .acquire_timeout(Duration::from_secs(8))
            .idle_timeout(Duration::from_secs(60))
            .max_lifetime(Duration::from_secs(300))
            .sqlx_logging(false)
            .sqlx_logging_level(log::LevelFilter::Info);

        let db = Database::connect(opt)
            .await
            .expect("Failed to connect to database");

        db.execute(Statement::from_string(DbBackend::Postgres, "SELECT 1".to_owned()))
            .await
            .expect("Failed to execute test query");

        info!("Database connection pool initialized successfully");
        db
    }

    async fn init_cache(app_cfg: &AppConfigImpl) -> Arc<dyn CacheBackend> {
        let cache_cfg = app_cfg.cache();
        match cache_cfg.backend {
            CacheBackendKind::Redis => Arc::new(
                RedisCache::connect(&cache_cfg.redis_url)
                    .await
                    .expect("Failed to connect to redis"),
            ),
            CacheBackendKind::Memory => {
                info!("Using in-process cache backend");
                Arc::new(InMemoryCache::new())
            }
        }
    }

    pub async fn new(db: DatabaseConnection, app_cfg: AppConfigImpl) -> Self {
        let cache_cfg = app_cfg.cache();
        let flush_cfg = app_cfg.flush();
        let cache = Self::init_cache(&app_cfg).await;
        let keys = KeySpace::new(cache_cfg.key_prefix.clone());

        let id_generator: Arc<dyn IdGenerator> = Arc::new(
            SnowflakeIdGenerator::new(app_cfg.node_id()).expect("Invalid snowflake node id"),
        );
        let stats: Arc<dyn StatRepository> = Arc::new(StatRepositoryImpl::new(db.clone()));
        let interactions: Arc<dyn InteractionRepository> =
            Arc::new(InteractionRepositoryImpl::new(db.clone()));
        let comments: Arc<dyn CommentRepository> =
            Arc::new(CommentRepositoryImpl::new(db.clone()));
        let behavior_logs: Arc<dyn BehaviorLogRepository> =
            Arc::new(BehaviorLogRepositoryImpl::new(db.clone()));

        let counters = CounterStore::new(cache.clone(), keys.clone(), cache_cfg.snapshot_ttl);
        let buffer = DeltaBuffer::new(cache.clone(), keys.clone(), flush_cfg.claim_ttl);
        let loader = SnapshotLoader::new(stats.clone(), counters.clone(), buffer.clone());
        let membership = InteractionStateStore::new(cache, keys, cache_cfg.membership_ttl);
        let lookup = RelationLookup::new(membership, interactions.clone());

        let mut event_bus = InMemoryEventBus::new_async();
        register_handlers(&mut event_bus).await;

        let log_sink = BehaviorLogSink::start(behavior_logs, app_cfg.behavior_log());
        let writer = CounterWriter::new(
            counters.clone(),
            buffer.clone(),
            loader.clone(),
            stats.clone(),
            app_cfg.counter_policy(),
        );
        let recorder = Arc::new(BehaviorRecorder::new(
            interactions.clone(),
            comments,
            writer,
            lookup.clone(),
            log_sink.clone(),
            id_generator,
            Arc::new(event_bus.clone()),
        ));

        let scheduler = BufferFlushScheduler::new(buffer, stats.clone(), flush_cfg.interval);
        let reconciler = Reconciler::new(
            scheduler.clone(),
            interactions,
            stats.clone(),
            counters.clone(),
        );

        Self {
            hydration: ReadHydration::new(counters, loader.clone(), lookup.clone()),
            relations: RelationQuery::new(lookup),
            history: HistoryQuery::new(Arc::new(BehaviorHistoryRepositoryImpl::new(db.clone()))),
            analysis: AnalysisQuery::new(Arc::new(StatAnalysisRepositoryImpl::new(db.clone()))),
            videos: VideoStatService::new(stats, loader),
            db,
            cfg: app_cfg,
            recorder,
            scheduler,
            reconciler,
            log_sink,
            event_bus,
        }
    }

    pub fn start(&self) {
        self.scheduler.start();
    }

    /// 停止刷盘循环并做最后一次刷盘，再排空行为日志队列
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
        self.log_sink.shutdown().await;
        info!("engagement service stopped");
    }
}
