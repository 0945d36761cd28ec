//! # Redis
//!
//! 计数快照、关系集合与增量缓冲区的共享存储。
//!
//! - 快照：`{prefix}video:stat:{id}` 哈希，字段为各计数器
//! - 关系：`{prefix}user:{kind}:{uid}` 集合
//! - 缓冲：`{{prefix}buffer:{kind}}` 哈希，认领时改名为同一 hash tag 下的临时键
//! - 栅栏：`{{prefix}buffer:{kind}}:fence` 整数，认领中为奇数
//!
//! 需要"检查后写入"的操作都放在 Lua 脚本里，保证单键原子性。

use application::cache::{CacheBackend, CacheError, Claim};
use async_trait::async_trait;
use log::info;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client, ErrorKind, RedisError, Script};
use std::collections::HashMap;
use std::time::Duration;

const INCR_EXISTING: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return redis.call('HINCRBY', KEYS[1], ARGV[1], ARGV[2])
end
return false
"#;

const SEED_IF_ABSENT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return 0
end
for i = 2, #ARGV, 2 do
  redis.call('HSET', KEYS[1], ARGV[i], ARGV[i + 1])
end
redis.call('EXPIRE', KEYS[1], ARGV[1])
return 1
"#;

const ADD_EXISTING: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return 0
end
redis.call('SREM', KEYS[1], ARGV[2])
redis.call('SADD', KEYS[1], ARGV[1])
redis.call('EXPIRE', KEYS[1], ARGV[3])
return 1
"#;

const CONTAINS_MANY: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return false
end
local out = {}
for i = 1, #ARGV do
  out[i] = redis.call('SISMEMBER', KEYS[1], ARGV[i])
end
return out
"#;

const CLAIM: &str = r#"
local fence = tonumber(redis.call('GET', KEYS[3]) or '0')
if fence % 2 == 1 then
  return {-1, {}}
end
if redis.call('EXISTS', KEYS[1]) == 0 then
  return {0, {}}
end
redis.call('RENAME', KEYS[1], KEYS[2])
redis.call('EXPIRE', KEYS[2], ARGV[1])
redis.call('INCR', KEYS[3])
redis.call('EXPIRE', KEYS[3], ARGV[1])
return {1, redis.call('HGETALL', KEYS[2])}
"#;

const CLAIM_FINISH: &str = r#"
redis.call('DEL', KEYS[1])
local fence = tonumber(redis.call('GET', KEYS[2]) or '0')
if fence % 2 == 1 then
  redis.call('INCR', KEYS[2])
  redis.call('PERSIST', KEYS[2])
end
return 1
"#;

fn map_err(e: RedisError) -> CacheError {
    match e.kind() {
        ErrorKind::TypeError | ErrorKind::ResponseError => CacheError::Protocol(e.to_string()),
        _ => CacheError::Unavailable(e.to_string()),
    }
}

fn ttl_secs(ttl: Duration) -> i64 {
    ttl.as_secs().max(1) as i64
}

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    incr_existing: Script,
    seed_if_absent: Script,
    add_existing: Script,
    contains_many: Script,
    claim: Script,
    claim_finish: Script,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(500));

        let client = Client::open(redis_url).map_err(map_err)?;
        let conn = client
            .get_connection_manager_with_config(config)
            .await
            .map_err(map_err)?;
        info!("Redis connection manager initialized");

        Ok(Self {
            conn,
            incr_existing: Script::new(INCR_EXISTING),
            seed_if_absent: Script::new(SEED_IF_ABSENT),
            add_existing: Script::new(ADD_EXISTING),
            contains_many: Script::new(CONTAINS_MANY),
            claim: Script::new(CLAIM),
            claim_finish: Script::new(CLAIM_FINISH),
        })
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        conn.hincr(key, field, delta).await.map_err(map_err)
    }

    async fn hash_incr_existing(
        &self,
        key: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<i64>, CacheError> {
        let mut conn = self.conn.clone();
        self.incr_existing
            .key(key)
            .arg(field)
            .arg(delta)
            .invoke_async(&mut conn)
            .await
            .map_err(map_err)
    }

    async fn hash_incr_many(&self, key: &str, deltas: &[(String, i64)]) -> Result<(), CacheError> {
        if deltas.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (field, delta) in deltas {
            pipe.hincr(key, field, *delta).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(map_err)?;
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<i64>, CacheError> {
        let mut conn = self.conn.clone();
        conn.hget(key, field).await.map_err(map_err)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, i64>, CacheError> {
        let mut conn = self.conn.clone();
        conn.hgetall(key).await.map_err(map_err)
    }

    async fn hash_get_all_many(
        &self,
        keys: &[String],
    ) -> Result<Vec<HashMap<String, i64>>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.hgetall(key);
        }
        pipe.query_async(&mut conn).await.map_err(map_err)
    }

    async fn hash_seed(
        &self,
        key: &str,
        fields: &[(String, i64)],
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let mut invocation = self.seed_if_absent.prepare_invoke();
        invocation.key(key).arg(ttl_secs(ttl));
        for (field, value) in fields {
            invocation.arg(field).arg(*value);
        }
        let seeded: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(seeded == 1)
    }

    async fn set_add_existing(
        &self,
        key: &str,
        member: &str,
        placeholder: &str,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let added: i64 = self
            .add_existing
            .key(key)
            .arg(member)
            .arg(placeholder)
            .arg(ttl_secs(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(added == 1)
    }

    async fn set_replace(
        &self,
        key: &str,
        members: &[String],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic().del(key).ignore();
        if !members.is_empty() {
            pipe.sadd(key, members).ignore();
            pipe.expire(key, ttl_secs(ttl)).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(map_err)?;
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.srem(key, member).await.map_err(map_err)?;
        Ok(())
    }

    async fn set_contains_many(
        &self,
        key: &str,
        members: &[String],
    ) -> Result<Option<Vec<bool>>, CacheError> {
        let mut conn = self.conn.clone();
        let mut invocation = self.contains_many.prepare_invoke();
        invocation.key(key);
        for member in members {
            invocation.arg(member);
        }
        let flags: Option<Vec<i64>> = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(flags.map(|v| v.into_iter().map(|f| f == 1).collect()))
    }

    async fn set_members(&self, key: &str) -> Result<Option<Vec<String>>, CacheError> {
        let mut conn = self.conn.clone();
        let (exists, members): (bool, Vec<String>) = redis::pipe()
            .atomic()
            .exists(key)
            .smembers(key)
            .query_async(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(exists.then_some(members))
    }

    async fn hash_claim(
        &self,
        from: &str,
        to: &str,
        fence: &str,
        ttl: Duration,
    ) -> Result<Claim, CacheError> {
        let mut conn = self.conn.clone();
        let (status, fields): (i64, HashMap<String, i64>) = self
            .claim
            .key(from)
            .key(to)
            .key(fence)
            .arg(ttl_secs(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(map_err)?;
        match status {
            1 => Ok(Claim::Taken(fields)),
            0 => Ok(Claim::Empty),
            -1 => Ok(Claim::Busy),
            other => Err(CacheError::Protocol(format!("claim status {}", other))),
        }
    }

    async fn claim_finish(&self, claim_key: &str, fence: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = self
            .claim_finish
            .key(claim_key)
            .key(fence)
            .invoke_async(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn fence_get_many(&self, fences: &[String]) -> Result<Vec<i64>, CacheError> {
        if fences.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        for fence in fences {
            pipe.get(fence);
        }
        let values: Vec<Option<i64>> = pipe.query_async(&mut conn).await.map_err(map_err)?;
        Ok(values.into_iter().map(|v| v.unwrap_or(0)).collect())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(key).await.map_err(map_err)?;
        Ok(())
    }
}
