pub mod in_memory;
pub mod redis;

pub use self::in_memory::InMemoryCache;
pub use self::redis::RedisCache;
