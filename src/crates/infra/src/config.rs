use application::behavior_log::BehaviorLogSettings;
use application::command::policy::CounterPolicy;
use application::error::AppError;
use application::store::MembershipTtl;
use config::{Config, Environment, File};
use dotenvy::dotenv;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    database_url: String,
    /// 雪花算法节点号
    node_id: i64,
    cache: RawCacheConfig,
    flush: RawFlushConfig,
    behavior_log: RawBehaviorLogConfig,
    /// 计数器 -> buffered | synchronous
    counter_policy: HashMap<String, String>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            database_url: "".to_string(),
            node_id: 1,
            cache: RawCacheConfig::default(),
            flush: RawFlushConfig::default(),
            behavior_log: RawBehaviorLogConfig::default(),
            counter_policy: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawCacheConfig {
    /// redis | memory
    backend: String,
    redis_url: String,
    key_prefix: String,
    snapshot_ttl_secs: u64,
    membership_ttl_secs: u64,
    membership_ttl_jitter_secs: u64,
    empty_membership_ttl_secs: u64,
}

impl Default for RawCacheConfig {
    fn default() -> Self {
        Self {
            backend: "redis".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "teektok".to_string(),
            snapshot_ttl_secs: 24 * 3600,
            membership_ttl_secs: 24 * 3600,
            membership_ttl_jitter_secs: 3600,
            empty_membership_ttl_secs: 300,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawFlushConfig {
    interval_ms: u64,
    /// 认领后临时键的保留时间
    claim_ttl_secs: u64,
}

impl Default for RawFlushConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            claim_ttl_secs: 600,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawBehaviorLogConfig {
    queue_capacity: usize,
    /// 0 表示按 CPU 核数的两倍
    workers: usize,
    batch_size: usize,
}

impl Default for RawBehaviorLogConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 500,
            workers: 0,
            batch_size: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Redis,
    Memory,
}

/// 缓存配置
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    pub redis_url: String,
    pub key_prefix: String,
    pub snapshot_ttl: Duration,
    pub membership_ttl: MembershipTtl,
}

/// 刷盘配置
#[derive(Debug, Clone)]
pub struct FlushConfig {
    pub interval: Duration,
    pub claim_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfigImpl {
    pub database_url: Arc<RwLock<String>>,
    pub node_id: Arc<AtomicI64>,
    pub cache: Arc<RwLock<CacheConfig>>,
    pub flush: Arc<RwLock<FlushConfig>>,
    pub behavior_log: Arc<RwLock<BehaviorLogSettings>>,
    pub counter_policy: Arc<RwLock<CounterPolicy>>,
}

impl AppConfigImpl {
    fn new(data: RawConfig) -> Result<Self, AppError> {
        let backend = match data.cache.backend.to_ascii_lowercase().as_str() {
            "redis" => CacheBackendKind::Redis,
            "memory" => CacheBackendKind::Memory,
            other => {
                return Err(AppError::InvalidInput(format!(
                    "unknown cache backend: {}",
                    other
                )))
            }
        };
        let cache_config = CacheConfig {
            backend,
            redis_url: data.cache.redis_url,
            key_prefix: data.cache.key_prefix,
            snapshot_ttl: Duration::from_secs(data.cache.snapshot_ttl_secs),
            membership_ttl: MembershipTtl {
                base: Duration::from_secs(data.cache.membership_ttl_secs),
                jitter: Duration::from_secs(data.cache.membership_ttl_jitter_secs),
                empty: Duration::from_secs(data.cache.empty_membership_ttl_secs),
            },
        };
        let flush_config = FlushConfig {
            interval: Duration::from_millis(data.flush.interval_ms.max(1)),
            claim_ttl: Duration::from_secs(data.flush.claim_ttl_secs),
        };
        let mut log_settings = BehaviorLogSettings::default();
        log_settings.queue_capacity = data.behavior_log.queue_capacity;
        log_settings.batch_size = data.behavior_log.batch_size;
        if data.behavior_log.workers > 0 {
            log_settings.workers = data.behavior_log.workers;
        }
        let policy = CounterPolicy::from_names(&data.counter_policy)?;

        Ok(AppConfigImpl {
            database_url: Arc::new(RwLock::new(data.database_url)),
            node_id: Arc::new(AtomicI64::new(data.node_id)),
            cache: Arc::new(RwLock::new(cache_config)),
            flush: Arc::new(RwLock::new(flush_config)),
            behavior_log: Arc::new(RwLock::new(log_settings)),
            counter_policy: Arc::new(RwLock::new(policy)),
        })
    }

    pub fn load() -> Result<AppConfigImpl, Box<dyn Error>> {
        dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        let raw: RawConfig = config.try_deserialize()?; // serde 自动填充默认值
        Ok(AppConfigImpl::new(raw)?)
    }

    pub fn database_url(&self) -> String {
        self.database_url.read().clone()
    }

    pub fn node_id(&self) -> i64 {
        self.node_id.load(Ordering::SeqCst)
    }

    pub fn cache(&self) -> CacheConfig {
        self.cache.read().clone()
    }

    pub fn flush(&self) -> FlushConfig {
        self.flush.read().clone()
    }

    pub fn behavior_log(&self) -> BehaviorLogSettings {
        self.behavior_log.read().clone()
    }

    pub fn counter_policy(&self) -> CounterPolicy {
        self.counter_policy.read().clone()
    }
}
