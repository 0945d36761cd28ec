use async_trait::async_trait;
use dashmap::DashMap;
use domain::counter::{CounterError, CounterKind, CounterSnapshot, StatRepository, TargetScope};
use model::analysis::{EngagementTotals, StatAnalysisRepository};
use model::ModelError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// 内存版计数表，可注入写失败
#[derive(Clone, Default)]
pub struct InMemoryStatRepository {
    store: Arc<DashMap<(TargetScope, i64), CounterSnapshot>>,
    failing: Arc<AtomicBool>,
    batches: Arc<AtomicUsize>,
}

impl InMemoryStatRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开后所有写操作返回数据库错误
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// 成功执行的批量合并次数
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn value(&self, kind: CounterKind, target_id: i64) -> i64 {
        self.store
            .get(&(kind.scope(), target_id))
            .map(|s| s.get(kind))
            .unwrap_or(0)
    }

    fn check(&self) -> Result<(), CounterError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CounterError::DbErr("injected write failure".to_string()));
        }
        Ok(())
    }

    fn add(&self, kind: CounterKind, target_id: i64, delta: i64) {
        let mut entry = self
            .store
            .entry((kind.scope(), target_id))
            .or_insert_with(|| CounterSnapshot::zeroed(kind.scope(), target_id));
        let value = (entry.get(kind) + delta).max(0);
        entry.set(kind, value);
    }
}

#[async_trait]
impl StatRepository for InMemoryStatRepository {
    async fn create(&self, scope: TargetScope, target_id: i64) -> Result<(), CounterError> {
        self.check()?;
        self.store
            .entry((scope, target_id))
            .or_insert_with(|| CounterSnapshot::zeroed(scope, target_id));
        Ok(())
    }

    async fn find(
        &self,
        scope: TargetScope,
        target_id: i64,
    ) -> Result<Option<CounterSnapshot>, CounterError> {
        Ok(self.store.get(&(scope, target_id)).map(|s| s.clone()))
    }

    async fn find_many(
        &self,
        scope: TargetScope,
        target_ids: &[i64],
    ) -> Result<Vec<CounterSnapshot>, CounterError> {
        Ok(target_ids
            .iter()
            .filter_map(|id| self.store.get(&(scope, *id)).map(|s| s.clone()))
            .collect())
    }

    async fn increment(
        &self,
        kind: CounterKind,
        target_id: i64,
        delta: i64,
    ) -> Result<(), CounterError> {
        self.check()?;
        self.add(kind, target_id, delta);
        Ok(())
    }

    async fn apply_deltas(
        &self,
        kind: CounterKind,
        deltas: &[(i64, i64)],
    ) -> Result<u64, CounterError> {
        self.check()?;
        for (target_id, delta) in deltas {
            self.add(kind, *target_id, *delta);
        }
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(deltas.len() as u64)
    }

    async fn overwrite(
        &self,
        kind: CounterKind,
        target_id: i64,
        value: i64,
    ) -> Result<(), CounterError> {
        self.check()?;
        self.store
            .entry((kind.scope(), target_id))
            .or_insert_with(|| CounterSnapshot::zeroed(kind.scope(), target_id))
            .set(kind, value.max(0));
        Ok(())
    }
}

#[async_trait]
impl StatAnalysisRepository for InMemoryStatRepository {
    async fn totals(&self) -> Result<EngagementTotals, ModelError> {
        let mut totals = EngagementTotals::default();
        for entry in self.store.iter() {
            if entry.key().0 != TargetScope::Video {
                continue;
            }
            let s = entry.value();
            totals.play_count += s.get(CounterKind::Play);
            totals.like_count += s.get(CounterKind::Like);
            totals.comment_count += s.get(CounterKind::Comment);
            totals.share_count += s.get(CounterKind::Share);
            totals.favorite_count += s.get(CounterKind::Favorite);
        }
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_apply_deltas_clamps_and_creates_rows() {
        let repo = InMemoryStatRepository::new();
        repo.apply_deltas(CounterKind::Like, &[(1, 5), (2, -3)])
            .await
            .unwrap();
        assert_eq!(repo.value(CounterKind::Like, 1), 5);
        assert_eq!(repo.value(CounterKind::Like, 2), 0);
        assert!(repo.find(TargetScope::Video, 2).await.unwrap().is_some());
        assert_eq!(repo.batches(), 1);
    }

    #[tokio::test]
    async fn test_failure_injection_and_totals() {
        let repo = InMemoryStatRepository::new();
        repo.increment(CounterKind::Play, 1, 4).await.unwrap();
        repo.increment(CounterKind::Play, 2, 6).await.unwrap();
        repo.increment(CounterKind::CommentLike, 9, 2).await.unwrap();

        repo.set_failing(true);
        assert!(repo.apply_deltas(CounterKind::Play, &[(1, 1)]).await.is_err());
        assert_eq!(repo.value(CounterKind::Play, 1), 4);
        repo.set_failing(false);

        let totals = repo.totals().await.unwrap();
        assert_eq!(totals.play_count, 10);
        assert_eq!(totals.like_count, 0);
    }
}
