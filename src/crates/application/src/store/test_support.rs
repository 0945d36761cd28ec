use crate::cache::{CacheBackend, CacheError, Claim};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

enum Value {
    Hash(HashMap<String, i64>),
    Set(HashSet<String>),
}

/// 单元测试用的简易缓存，不处理过期
#[derive(Default)]
pub(crate) struct MemoryCache {
    data: Mutex<HashMap<String, Value>>,
    fences: Mutex<HashMap<String, i64>>,
}

impl MemoryCache {
    pub(crate) fn contains_key(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.data.lock().keys().cloned().collect()
    }

    pub(crate) fn fence(&self, key: &str) -> i64 {
        self.fences.lock().get(key).copied().unwrap_or(0)
    }
}

fn wrong_type(key: &str) -> CacheError {
    CacheError::Protocol(format!("wrong type for {}", key))
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64, CacheError> {
        let mut data = self.data.lock();
        match data
            .entry(key.to_string())
            .or_insert_with(|| Value::Hash(HashMap::new()))
        {
            Value::Hash(h) => {
                let v = h.entry(field.to_string()).or_insert(0);
                *v += delta;
                Ok(*v)
            }
            Value::Set(_) => Err(wrong_type(key)),
        }
    }

    async fn hash_incr_existing(
        &self,
        key: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<i64>, CacheError> {
        let mut data = self.data.lock();
        match data.get_mut(key) {
            None => Ok(None),
            Some(Value::Hash(h)) => {
                let v = h.entry(field.to_string()).or_insert(0);
                *v += delta;
                Ok(Some(*v))
            }
            Some(Value::Set(_)) => Err(wrong_type(key)),
        }
    }

    async fn hash_incr_many(&self, key: &str, deltas: &[(String, i64)]) -> Result<(), CacheError> {
        for (field, delta) in deltas {
            self.hash_incr(key, field, *delta).await?;
        }
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<i64>, CacheError> {
        match self.data.lock().get(key) {
            None => Ok(None),
            Some(Value::Hash(h)) => Ok(h.get(field).copied()),
            Some(Value::Set(_)) => Err(wrong_type(key)),
        }
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, i64>, CacheError> {
        match self.data.lock().get(key) {
            None => Ok(HashMap::new()),
            Some(Value::Hash(h)) => Ok(h.clone()),
            Some(Value::Set(_)) => Err(wrong_type(key)),
        }
    }

    async fn hash_get_all_many(
        &self,
        keys: &[String],
    ) -> Result<Vec<HashMap<String, i64>>, CacheError> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.hash_get_all(key).await?);
        }
        Ok(out)
    }

    async fn hash_seed(
        &self,
        key: &str,
        fields: &[(String, i64)],
        _ttl: Duration,
    ) -> Result<bool, CacheError> {
        let mut data = self.data.lock();
        if data.contains_key(key) {
            return Ok(false);
        }
        data.insert(
            key.to_string(),
            Value::Hash(fields.iter().cloned().collect()),
        );
        Ok(true)
    }

    async fn set_add_existing(
        &self,
        key: &str,
        member: &str,
        placeholder: &str,
        _ttl: Duration,
    ) -> Result<bool, CacheError> {
        match self.data.lock().get_mut(key) {
            None => Ok(false),
            Some(Value::Set(s)) => {
                s.remove(placeholder);
                s.insert(member.to_string());
                Ok(true)
            }
            Some(Value::Hash(_)) => Err(wrong_type(key)),
        }
    }

    async fn set_replace(
        &self,
        key: &str,
        members: &[String],
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        self.data.lock().insert(
            key.to_string(),
            Value::Set(members.iter().cloned().collect()),
        );
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), CacheError> {
        if let Some(Value::Set(s)) = self.data.lock().get_mut(key) {
            s.remove(member);
        }
        Ok(())
    }

    async fn set_contains_many(
        &self,
        key: &str,
        members: &[String],
    ) -> Result<Option<Vec<bool>>, CacheError> {
        match self.data.lock().get(key) {
            None => Ok(None),
            Some(Value::Set(s)) => Ok(Some(members.iter().map(|m| s.contains(m)).collect())),
            Some(Value::Hash(_)) => Err(wrong_type(key)),
        }
    }

    async fn set_members(&self, key: &str) -> Result<Option<Vec<String>>, CacheError> {
        match self.data.lock().get(key) {
            None => Ok(None),
            Some(Value::Set(s)) => Ok(Some(s.iter().cloned().collect())),
            Some(Value::Hash(_)) => Err(wrong_type(key)),
        }
    }

    async fn hash_claim(
        &self,
        from: &str,
        to: &str,
        fence: &str,
        _ttl: Duration,
    ) -> Result<Claim, CacheError> {
        let mut fences = self.fences.lock();
        let gen = fences.entry(fence.to_string()).or_insert(0);
        if *gen % 2 == 1 {
            return Ok(Claim::Busy);
        }
        let mut data = self.data.lock();
        match data.remove(from) {
            Some(Value::Hash(h)) => {
                *gen += 1;
                data.insert(to.to_string(), Value::Hash(h.clone()));
                Ok(Claim::Taken(h))
            }
            Some(v) => {
                data.insert(from.to_string(), v);
                Err(wrong_type(from))
            }
            None => Ok(Claim::Empty),
        }
    }

    async fn claim_finish(&self, claim_key: &str, fence: &str) -> Result<(), CacheError> {
        self.data.lock().remove(claim_key);
        if let Some(gen) = self.fences.lock().get_mut(fence) {
            if *gen % 2 == 1 {
                *gen += 1;
            }
        }
        Ok(())
    }

    async fn fence_get_many(&self, fences: &[String]) -> Result<Vec<i64>, CacheError> {
        let map = self.fences.lock();
        Ok(fences
            .iter()
            .map(|f| map.get(f).copied().unwrap_or(0))
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.data.lock().remove(key);
        Ok(())
    }
}
