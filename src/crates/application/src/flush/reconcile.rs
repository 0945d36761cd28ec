use super::BufferFlushScheduler;
use crate::error::AppError;
use crate::store::CounterStore;
use domain::counter::{CounterKind, StatRepository};
use domain::interaction::{InteractionRepository, RelationKind};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// 以关系表为准重算开关类计数，修正崩溃丢失的增量。
///
/// 关系行已写入而缓冲增量尚未写入的请求会被多算一次，下一次对账时修正。
pub struct Reconciler {
    scheduler: Arc<BufferFlushScheduler>,
    interactions: Arc<dyn InteractionRepository>,
    stats: Arc<dyn StatRepository>,
    counters: CounterStore,
}

impl Reconciler {
    pub fn new(
        scheduler: Arc<BufferFlushScheduler>,
        interactions: Arc<dyn InteractionRepository>,
        stats: Arc<dyn StatRepository>,
        counters: CounterStore,
    ) -> Self {
        Self {
            scheduler,
            interactions,
            stats,
            counters,
        }
    }

    /// 返回被修正的目标数
    pub async fn reconcile(
        &self,
        kind: CounterKind,
        target_ids: &[i64],
    ) -> Result<usize, AppError> {
        let relation = RelationKind::for_counter(kind).ok_or_else(|| {
            AppError::InvalidInput(format!("{} is not backed by a relation", kind))
        })?;
        if target_ids.is_empty() {
            return Ok(0);
        }

        // 全程持有刷盘锁，重算与覆盖之间不会有本进程的合并插进来
        let _guard = self.scheduler.lock_kind(kind).await?;
        self.scheduler.flush_locked(kind).await?;

        let truth = self
            .interactions
            .count_by_targets(relation, target_ids)
            .await?;
        // 刷盘后新写入的关系已计入 truth，其增量仍在缓冲区里等下一轮合并
        let mut pending = HashMap::with_capacity(target_ids.len());
        for id in target_ids {
            pending.insert(*id, self.scheduler.buffer().pending(kind, *id).await?);
        }
        let stored: HashMap<i64, i64> = self
            .stats
            .find_many(kind.scope(), target_ids)
            .await?
            .into_iter()
            .map(|s| (s.target_id, s.get(kind)))
            .collect();

        let mut fixed = 0;
        for id in target_ids {
            let expected = truth.get(id).copied().unwrap_or(0)
                - pending.get(id).copied().unwrap_or(0);
            if stored.get(id).copied().unwrap_or(0) != expected {
                self.stats.overwrite(kind, *id, expected).await?;
                fixed += 1;
            }
            if let Err(e) = self.counters.evict(kind.scope(), *id).await {
                warn!("[{}] failed to evict snapshot {}: {}", kind, id, e);
            }
        }
        info!(
            "[{}] reconciled {} targets, {} corrected",
            kind,
            target_ids.len(),
            fixed
        );
        Ok(fixed)
    }
}
