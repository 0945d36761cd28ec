use crate::cache::{CacheBackend, CacheError, KeySpace};
use domain::interaction::RelationKind;
use domain::value::UserId;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// 空集合占位成员，防止冷用户反复穿透到数据库
pub const EMPTY_MARKER: &str = "-1";

#[derive(Debug, Clone)]
pub struct MembershipTtl {
    pub base: Duration,
    /// 在 base 之上随机追加 0..=jitter，避免集中过期
    pub jitter: Duration,
    /// 空集合占位的过期时间
    pub empty: Duration,
}

impl Default for MembershipTtl {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(24 * 3600),
            jitter: Duration::from_secs(3600),
            empty: Duration::from_secs(300),
        }
    }
}

/// 用户关系集合缓存。
///
/// 读取结果区分"确定不是成员"与"集合不在缓存中"，后者需要调用方回源重建。
#[derive(Clone)]
pub struct InteractionStateStore {
    cache: Arc<dyn CacheBackend>,
    keys: KeySpace,
    ttl: MembershipTtl,
}

impl InteractionStateStore {
    pub fn new(cache: Arc<dyn CacheBackend>, keys: KeySpace, ttl: MembershipTtl) -> Self {
        Self { cache, keys, ttl }
    }

    pub async fn contains(
        &self,
        user_id: UserId,
        kind: RelationKind,
        target_id: i64,
    ) -> Result<Option<bool>, CacheError> {
        let hit = self.contains_many(user_id, kind, &[target_id]).await?;
        Ok(hit.and_then(|v| v.first().copied()))
    }

    pub async fn contains_many(
        &self,
        user_id: UserId,
        kind: RelationKind,
        target_ids: &[i64],
    ) -> Result<Option<Vec<bool>>, CacheError> {
        let members: Vec<String> = target_ids.iter().map(|id| id.to_string()).collect();
        let key = self.keys.membership(user_id, kind);
        self.cache.set_contains_many(&key, &members).await
    }

    /// 集合已在缓存中时加入成员，冷集合不创建，返回是否写入
    pub async fn add(
        &self,
        user_id: UserId,
        kind: RelationKind,
        target_id: i64,
    ) -> Result<bool, CacheError> {
        let key = self.keys.membership(user_id, kind);
        self.cache
            .set_add_existing(&key, &target_id.to_string(), EMPTY_MARKER, self.jittered_ttl())
            .await
    }

    pub async fn remove(
        &self,
        user_id: UserId,
        kind: RelationKind,
        target_id: i64,
    ) -> Result<(), CacheError> {
        let key = self.keys.membership(user_id, kind);
        self.cache.set_remove(&key, &target_id.to_string()).await
    }

    /// 用持久层结果重建集合
    pub async fn fill(
        &self,
        user_id: UserId,
        kind: RelationKind,
        target_ids: &[i64],
    ) -> Result<(), CacheError> {
        let key = self.keys.membership(user_id, kind);
        if target_ids.is_empty() {
            return self
                .cache
                .set_replace(&key, &[EMPTY_MARKER.to_string()], self.ttl.empty)
                .await;
        }
        let members: Vec<String> = target_ids.iter().map(|id| id.to_string()).collect();
        self.cache
            .set_replace(&key, &members, self.jittered_ttl())
            .await
    }

    pub async fn members(
        &self,
        user_id: UserId,
        kind: RelationKind,
    ) -> Result<Option<Vec<i64>>, CacheError> {
        let key = self.keys.membership(user_id, kind);
        let raw = match self.cache.set_members(&key).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let mut ids: Vec<i64> = raw
            .iter()
            .filter(|m| m.as_str() != EMPTY_MARKER)
            .filter_map(|m| m.parse().ok())
            .collect();
        ids.sort_unstable();
        Ok(Some(ids))
    }

    pub async fn invalidate(&self, user_id: UserId, kind: RelationKind) -> Result<(), CacheError> {
        self.cache.delete(&self.keys.membership(user_id, kind)).await
    }

    fn jittered_ttl(&self) -> Duration {
        let jitter = self.ttl.jitter.as_secs();
        let extra = if jitter == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter)
        };
        self.ttl.base + Duration::from_secs(extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::MemoryCache;

    fn store() -> InteractionStateStore {
        InteractionStateStore::new(
            Arc::new(MemoryCache::default()),
            KeySpace::new("t"),
            MembershipTtl::default(),
        )
    }

    #[tokio::test]
    async fn test_cold_set_is_unknown_not_false() {
        let store = store();
        let user = UserId::from(1);
        assert_eq!(store.contains(user, RelationKind::Like, 10).await.unwrap(), None);
        assert!(!store.add(user, RelationKind::Like, 10).await.unwrap());
        assert_eq!(store.contains(user, RelationKind::Like, 10).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_fill_answers_false_and_lists_nothing() {
        let store = store();
        let user = UserId::from(2);
        store.fill(user, RelationKind::Favorite, &[]).await.unwrap();
        assert_eq!(
            store.contains(user, RelationKind::Favorite, 5).await.unwrap(),
            Some(false)
        );
        assert_eq!(
            store.members(user, RelationKind::Favorite).await.unwrap(),
            Some(vec![])
        );

        assert!(store.add(user, RelationKind::Favorite, 5).await.unwrap());
        assert_eq!(
            store.members(user, RelationKind::Favorite).await.unwrap(),
            Some(vec![5])
        );
    }

    #[tokio::test]
    async fn test_batch_membership_follows_input_order() {
        let store = store();
        let user = UserId::from(3);
        store.fill(user, RelationKind::Like, &[4, 8]).await.unwrap();
        store.remove(user, RelationKind::Like, 4).await.unwrap();
        let flags = store
            .contains_many(user, RelationKind::Like, &[8, 4, 9])
            .await
            .unwrap();
        assert_eq!(flags, Some(vec![true, false, false]));
    }
}
