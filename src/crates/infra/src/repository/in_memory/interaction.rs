use async_trait::async_trait;
use chrono::NaiveDateTime;
use dashmap::DashMap;
use domain::interaction::{Interaction, InteractionError, InteractionRepository, RelationKind};
use domain::value::UserId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Key = (i64, RelationKind, i64);

#[derive(Clone, Default)]
pub struct InMemoryInteractionRepository {
    // 值为 (创建时间, 写入序号)，序号用于同一时刻的排序
    store: Arc<DashMap<Key, (NaiveDateTime, u64)>>,
    seq: Arc<AtomicU64>,
}

impl InMemoryInteractionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl InteractionRepository for InMemoryInteractionRepository {
    async fn insert(&self, interaction: &Interaction) -> Result<bool, InteractionError> {
        let key = (
            interaction.user_id.as_i64(),
            interaction.kind,
            interaction.target_id,
        );
        let mut inserted = false;
        self.store.entry(key).or_insert_with(|| {
            inserted = true;
            (
                interaction.created_at,
                self.seq.fetch_add(1, Ordering::SeqCst),
            )
        });
        Ok(inserted)
    }

    async fn delete(
        &self,
        user_id: UserId,
        kind: RelationKind,
        target_id: i64,
    ) -> Result<bool, InteractionError> {
        Ok(self
            .store
            .remove(&(user_id.as_i64(), kind, target_id))
            .is_some())
    }

    async fn exists(
        &self,
        user_id: UserId,
        kind: RelationKind,
        target_id: i64,
    ) -> Result<bool, InteractionError> {
        Ok(self.store.contains_key(&(user_id.as_i64(), kind, target_id)))
    }

    async fn targets_of(
        &self,
        user_id: UserId,
        kind: RelationKind,
    ) -> Result<Vec<i64>, InteractionError> {
        let mut rows: Vec<(NaiveDateTime, u64, i64)> = self
            .store
            .iter()
            .filter(|e| e.key().0 == user_id.as_i64() && e.key().1 == kind)
            .map(|e| (e.value().0, e.value().1, e.key().2))
            .collect();
        rows.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));
        Ok(rows.into_iter().map(|(_, _, target)| target).collect())
    }

    async fn count_by_targets(
        &self,
        kind: RelationKind,
        target_ids: &[i64],
    ) -> Result<HashMap<i64, i64>, InteractionError> {
        let mut counts = HashMap::new();
        for entry in self.store.iter() {
            let (_, k, target) = *entry.key();
            if k == kind && target_ids.contains(&target) {
                *counts.entry(target).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}
