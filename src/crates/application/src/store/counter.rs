use crate::cache::{CacheBackend, CacheError, KeySpace};
use domain::counter::{CounterKind, CounterSnapshot, TargetScope};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// 计数快照缓存，只访问缓存，不触碰持久层
#[derive(Clone)]
pub struct CounterStore {
    cache: Arc<dyn CacheBackend>,
    keys: KeySpace,
    ttl: Duration,
}

impl CounterStore {
    pub fn new(cache: Arc<dyn CacheBackend>, keys: KeySpace, ttl: Duration) -> Self {
        Self { cache, keys, ttl }
    }

    /// 快照存在时原子自增，快照缺失返回 None
    pub async fn increment_existing(
        &self,
        kind: CounterKind,
        target_id: i64,
        delta: i64,
    ) -> Result<Option<i64>, CacheError> {
        let key = self.keys.snapshot(kind.scope(), target_id);
        self.cache
            .hash_incr_existing(&key, kind.field(), delta)
            .await
    }

    /// 原子自增，快照缺失时以全零快照起步
    pub async fn increment(
        &self,
        kind: CounterKind,
        target_id: i64,
        delta: i64,
    ) -> Result<i64, CacheError> {
        self.seed(&CounterSnapshot::zeroed(kind.scope(), target_id))
            .await?;
        let key = self.keys.snapshot(kind.scope(), target_id);
        self.cache.hash_incr(&key, kind.field(), delta).await
    }

    pub async fn read(
        &self,
        scope: TargetScope,
        target_id: i64,
    ) -> Result<Option<CounterSnapshot>, CacheError> {
        let key = self.keys.snapshot(scope, target_id);
        let fields = self.cache.hash_get_all(&key).await?;
        Ok(Self::decode(scope, target_id, fields))
    }

    /// 一次往返读取多个快照，顺序与入参一致
    pub async fn read_many(
        &self,
        scope: TargetScope,
        target_ids: &[i64],
    ) -> Result<Vec<Option<CounterSnapshot>>, CacheError> {
        if target_ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = target_ids
            .iter()
            .map(|id| self.keys.snapshot(scope, *id))
            .collect();
        let rows = self.cache.hash_get_all_many(&keys).await?;
        if rows.len() != target_ids.len() {
            return Err(CacheError::Protocol(format!(
                "expected {} snapshots, got {}",
                target_ids.len(),
                rows.len()
            )));
        }
        Ok(target_ids
            .iter()
            .zip(rows)
            .map(|(id, fields)| Self::decode(scope, *id, fields))
            .collect())
    }

    /// 快照不存在时写入，已存在则保持原值
    pub async fn seed(&self, snapshot: &CounterSnapshot) -> Result<bool, CacheError> {
        let key = self.keys.snapshot(snapshot.scope, snapshot.target_id);
        let fields: Vec<(String, i64)> = snapshot
            .fields()
            .into_iter()
            .map(|(f, v)| (f.to_string(), v))
            .collect();
        self.cache.hash_seed(&key, &fields, self.ttl).await
    }

    pub async fn evict(&self, scope: TargetScope, target_id: i64) -> Result<(), CacheError> {
        self.cache.delete(&self.keys.snapshot(scope, target_id)).await
    }

    fn decode(
        scope: TargetScope,
        target_id: i64,
        fields: HashMap<String, i64>,
    ) -> Option<CounterSnapshot> {
        if fields.is_empty() {
            return None;
        }
        Some(CounterSnapshot::from_fields(
            scope,
            target_id,
            fields.iter().map(|(k, v)| (k.as_str(), *v)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::MemoryCache;

    fn store() -> CounterStore {
        CounterStore::new(
            Arc::new(MemoryCache::default()),
            KeySpace::new("t"),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_increment_existing_does_not_create_snapshot() {
        let store = store();
        let r = store
            .increment_existing(CounterKind::Like, 1, 1)
            .await
            .unwrap();
        assert_eq!(r, None);
        assert!(store.read(TargetScope::Video, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_increment_existing_after_seed() {
        let store = store();
        assert!(store
            .seed(&CounterSnapshot::zeroed(TargetScope::Video, 4))
            .await
            .unwrap());
        for expected in 1..=2 {
            let v = store
                .increment_existing(CounterKind::Play, 4, 1)
                .await
                .unwrap();
            assert_eq!(v, Some(expected));
        }
        let snap = store.read(TargetScope::Video, 4).await.unwrap().unwrap();
        assert_eq!(snap.get(CounterKind::Play), 2);
        assert_eq!(snap.get(CounterKind::Like), 0);
    }

    #[tokio::test]
    async fn test_increment_seeds_zero_snapshot() {
        let store = store();
        assert_eq!(store.increment(CounterKind::Play, 5, 1).await.unwrap(), 1);
        assert_eq!(store.increment(CounterKind::Play, 5, -3).await.unwrap(), -2);
        let snap = store.read(TargetScope::Video, 5).await.unwrap().unwrap();
        assert_eq!(snap.get(CounterKind::Play), -2);
        assert_eq!(snap.get(CounterKind::Share), 0);
    }

    #[tokio::test]
    async fn test_seed_keeps_existing_values() {
        let store = store();
        store
            .seed(&CounterSnapshot::zeroed(TargetScope::Video, 2).with(CounterKind::Like, 5))
            .await
            .unwrap();
        let seeded = store
            .seed(&CounterSnapshot::zeroed(TargetScope::Video, 2).with(CounterKind::Like, 100))
            .await
            .unwrap();
        assert!(!seeded);
        let snap = store.read(TargetScope::Video, 2).await.unwrap().unwrap();
        assert_eq!(snap.get(CounterKind::Like), 5);
    }

    #[tokio::test]
    async fn test_read_many_preserves_order_and_misses() {
        let store = store();
        store
            .seed(&CounterSnapshot::zeroed(TargetScope::Video, 3).with(CounterKind::Share, 2))
            .await
            .unwrap();
        let rows = store
            .read_many(TargetScope::Video, &[1, 3, 5])
            .await
            .unwrap();
        assert!(rows[0].is_none());
        assert_eq!(rows[1].as_ref().unwrap().get(CounterKind::Share), 2);
        assert!(rows[2].is_none());
    }
}
