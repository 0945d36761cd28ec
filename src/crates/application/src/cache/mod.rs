pub mod keys;

pub use keys::KeySpace;

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected cache reply: {0}")]
    Protocol(String),
}

/// 一次认领的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// 源键不存在
    Empty,
    /// 同一栅栏下已有未结束的认领
    Busy,
    /// 源键已改名为临时键，附带其全部字段
    Taken(HashMap<String, i64>),
}

/// 缓存后端抽象，覆盖哈希计数、集合成员与键管理三类原子操作。
///
/// 所有多键读取都要求实现方在一次往返内完成（管道或脚本）。
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// HINCRBY，键不存在时从 0 开始
    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64, CacheError>;

    /// 仅当键存在时自增，键不存在返回 None 且不创建
    async fn hash_incr_existing(
        &self,
        key: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<i64>, CacheError>;

    /// 对同一个哈希键批量自增
    async fn hash_incr_many(&self, key: &str, deltas: &[(String, i64)]) -> Result<(), CacheError>;

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<i64>, CacheError>;

    /// 键不存在时返回空表
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, i64>, CacheError>;

    /// 多键 HGETALL，结果顺序与入参一致
    async fn hash_get_all_many(
        &self,
        keys: &[String],
    ) -> Result<Vec<HashMap<String, i64>>, CacheError>;

    /// 键不存在时整体写入并设置过期时间，返回是否写入
    async fn hash_seed(
        &self,
        key: &str,
        fields: &[(String, i64)],
        ttl: Duration,
    ) -> Result<bool, CacheError>;

    /// 仅当集合存在时加入成员并刷新过期时间，同时清除空集合占位符
    async fn set_add_existing(
        &self,
        key: &str,
        member: &str,
        placeholder: &str,
        ttl: Duration,
    ) -> Result<bool, CacheError>;

    /// 用给定成员整体重建集合
    async fn set_replace(
        &self,
        key: &str,
        members: &[String],
        ttl: Duration,
    ) -> Result<(), CacheError>;

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), CacheError>;

    /// 集合不存在返回 None，否则逐个返回成员判断
    async fn set_contains_many(
        &self,
        key: &str,
        members: &[String],
    ) -> Result<Option<Vec<bool>>, CacheError>;

    async fn set_members(&self, key: &str) -> Result<Option<Vec<String>>, CacheError>;

    /// 单次原子操作：栅栏为偶数且源键存在时，源键改名为 `to` 并设置过期，
    /// 栅栏加一成为奇数（同样带过期），返回临时键的全部字段
    async fn hash_claim(
        &self,
        from: &str,
        to: &str,
        fence: &str,
        ttl: Duration,
    ) -> Result<Claim, CacheError>;

    /// 删除临时键；栅栏仍为奇数时加一并取消其过期
    async fn claim_finish(&self, claim_key: &str, fence: &str) -> Result<(), CacheError>;

    /// 批量读栅栏，不存在的按 0 计
    async fn fence_get_many(&self, fences: &[String]) -> Result<Vec<i64>, CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
