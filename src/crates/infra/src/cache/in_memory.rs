use application::cache::{CacheBackend, CacheError, Claim};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Value {
    Hash(HashMap<String, i64>),
    Set(HashSet<String>),
    Int(i64),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.expires_at.map_or(false, |at| Instant::now() >= at)
    }
}

/// 进程内缓存后端，单机部署与测试使用。
///
/// 单键操作依赖 DashMap 分片锁保证原子性，认领与栅栏另用一把锁串行。
#[derive(Clone, Default)]
pub struct InMemoryCache {
    store: Arc<DashMap<String, Entry>>,
    unavailable: Arc<AtomicBool>,
    fences: Arc<Mutex<()>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟后端故障
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.purge(key);
        self.store.contains_key(key)
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.store
            .iter()
            .filter(|e| e.key().starts_with(prefix) && !e.value().expired())
            .map(|e| e.key().clone())
            .collect()
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("in-memory cache disabled".to_string()));
        }
        Ok(())
    }

    fn purge(&self, key: &str) {
        self.store.remove_if(key, |_, e| e.expired());
    }

    fn fence_value(&self, fence: &str) -> Result<i64, CacheError> {
        self.purge(fence);
        match self.store.get(fence) {
            None => Ok(0),
            Some(entry) => match entry.value {
                Value::Int(n) => Ok(n),
                _ => Err(Self::wrong_type(fence)),
            },
        }
    }

    fn wrong_type(key: &str) -> CacheError {
        CacheError::Protocol(format!("WRONGTYPE {}", key))
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64, CacheError> {
        self.check()?;
        self.purge(key);
        let mut entry = self.store.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Hash(h) => {
                let v = h.entry(field.to_string()).or_insert(0);
                *v += delta;
                Ok(*v)
            }
            _ => Err(Self::wrong_type(key)),
        }
    }

    async fn hash_incr_existing(
        &self,
        key: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<i64>, CacheError> {
        self.check()?;
        self.purge(key);
        match self.store.get_mut(key) {
            None => Ok(None),
            Some(mut entry) => match &mut entry.value {
                Value::Hash(h) => {
                    let v = h.entry(field.to_string()).or_insert(0);
                    *v += delta;
                    Ok(Some(*v))
                }
                _ => Err(Self::wrong_type(key)),
            },
        }
    }

    async fn hash_incr_many(&self, key: &str, deltas: &[(String, i64)]) -> Result<(), CacheError> {
        self.check()?;
        self.purge(key);
        let mut entry = self.store.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Hash(h) => {
                for (field, delta) in deltas {
                    *h.entry(field.clone()).or_insert(0) += *delta;
                }
                Ok(())
            }
            _ => Err(Self::wrong_type(key)),
        }
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<i64>, CacheError> {
        self.check()?;
        self.purge(key);
        match self.store.get(key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Value::Hash(h) => Ok(h.get(field).copied()),
                _ => Err(Self::wrong_type(key)),
            },
        }
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, i64>, CacheError> {
        self.check()?;
        self.purge(key);
        match self.store.get(key) {
            None => Ok(HashMap::new()),
            Some(entry) => match &entry.value {
                Value::Hash(h) => Ok(h.clone()),
                _ => Err(Self::wrong_type(key)),
            },
        }
    }

    async fn hash_get_all_many(
        &self,
        keys: &[String],
    ) -> Result<Vec<HashMap<String, i64>>, CacheError> {
        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            rows.push(self.hash_get_all(key).await?);
        }
        Ok(rows)
    }

    async fn hash_seed(
        &self,
        key: &str,
        fields: &[(String, i64)],
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        self.check()?;
        self.purge(key);
        match self.store.entry(key.to_string()) {
            MapEntry::Occupied(_) => Ok(false),
            MapEntry::Vacant(v) => {
                v.insert(Entry {
                    value: Value::Hash(fields.iter().cloned().collect()),
                    expires_at: Some(Instant::now() + ttl),
                });
                Ok(true)
            }
        }
    }

    async fn set_add_existing(
        &self,
        key: &str,
        member: &str,
        placeholder: &str,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        self.check()?;
        self.purge(key);
        match self.store.get_mut(key) {
            None => Ok(false),
            Some(mut entry) => {
                match &mut entry.value {
                    Value::Set(s) => {
                        s.remove(placeholder);
                        s.insert(member.to_string());
                    }
                    _ => return Err(Self::wrong_type(key)),
                }
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
        }
    }

    async fn set_replace(
        &self,
        key: &str,
        members: &[String],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.check()?;
        self.store.insert(
            key.to_string(),
            Entry {
                value: Value::Set(members.iter().cloned().collect()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), CacheError> {
        self.check()?;
        self.purge(key);
        // 与 Redis 一致，删空的集合随之消失
        let removed = self.store.remove_if_mut(key, |_, entry| match &mut entry.value {
            Value::Set(s) => {
                s.remove(member);
                s.is_empty()
            }
            _ => false,
        });
        if removed.is_none() {
            if let Some(entry) = self.store.get(key) {
                if !matches!(entry.value, Value::Set(_)) {
                    return Err(Self::wrong_type(key));
                }
            }
        }
        Ok(())
    }

    async fn set_contains_many(
        &self,
        key: &str,
        members: &[String],
    ) -> Result<Option<Vec<bool>>, CacheError> {
        self.check()?;
        self.purge(key);
        match self.store.get(key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Value::Set(s) => Ok(Some(members.iter().map(|m| s.contains(m)).collect())),
                _ => Err(Self::wrong_type(key)),
            },
        }
    }

    async fn set_members(&self, key: &str) -> Result<Option<Vec<String>>, CacheError> {
        self.check()?;
        self.purge(key);
        match self.store.get(key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Value::Set(s) => Ok(Some(s.iter().cloned().collect())),
                _ => Err(Self::wrong_type(key)),
            },
        }
    }

    async fn hash_claim(
        &self,
        from: &str,
        to: &str,
        fence: &str,
        ttl: Duration,
    ) -> Result<Claim, CacheError> {
        self.check()?;
        let _gate = self.fences.lock();
        self.purge(from);
        if self.fence_value(fence)? % 2 == 1 {
            return Ok(Claim::Busy);
        }
        let fields = match self.store.remove(from) {
            None => return Ok(Claim::Empty),
            Some((_, entry)) => match entry.value {
                Value::Hash(h) => h,
                other => {
                    self.store.insert(
                        from.to_string(),
                        Entry {
                            value: other,
                            expires_at: entry.expires_at,
                        },
                    );
                    return Err(Self::wrong_type(from));
                }
            },
        };
        let expires_at = Some(Instant::now() + ttl);
        self.store.insert(
            to.to_string(),
            Entry {
                value: Value::Hash(fields.clone()),
                expires_at,
            },
        );
        let gen = self.fence_value(fence)?;
        self.store.insert(
            fence.to_string(),
            Entry {
                value: Value::Int(gen + 1),
                expires_at,
            },
        );
        Ok(Claim::Taken(fields))
    }

    async fn claim_finish(&self, claim_key: &str, fence: &str) -> Result<(), CacheError> {
        self.check()?;
        let _gate = self.fences.lock();
        self.store.remove(claim_key);
        let gen = self.fence_value(fence)?;
        if gen % 2 == 1 {
            self.store.insert(
                fence.to_string(),
                Entry {
                    value: Value::Int(gen + 1),
                    expires_at: None,
                },
            );
        }
        Ok(())
    }

    async fn fence_get_many(&self, fences: &[String]) -> Result<Vec<i64>, CacheError> {
        self.check()?;
        fences.iter().map(|f| self.fence_value(f)).collect()
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.check()?;
        self.store.remove(key);
        Ok(())
    }
}
