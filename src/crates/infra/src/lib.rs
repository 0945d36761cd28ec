pub mod repository;

pub mod event_bus;

pub mod id_generator;
pub use id_generator::SnowflakeIdGenerator;

pub mod cache;
pub use cache::{InMemoryCache, RedisCache};

pub mod config;
pub use config::{AppConfigImpl, CacheBackendKind, CacheConfig, FlushConfig};
