use super::{CounterStore, DeltaBuffer};
use crate::error::AppError;
use domain::counter::{CounterSnapshot, StatRepository, TargetScope};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const SETTLE_ATTEMPTS: u32 = 3;
const SETTLE_BACKOFF: Duration = Duration::from_millis(5);

/// 快照缺失时回源：持久计数加上活动缓冲区里尚未刷盘的增量
#[derive(Clone)]
pub struct SnapshotLoader {
    stats: Arc<dyn StatRepository>,
    counters: CounterStore,
    buffer: DeltaBuffer,
}

impl SnapshotLoader {
    pub fn new(stats: Arc<dyn StatRepository>, counters: CounterStore, buffer: DeltaBuffer) -> Self {
        Self {
            stats,
            counters,
            buffer,
        }
    }

    /// 只读持久层，缓存不可用时的降级读
    pub async fn durable(
        &self,
        scope: TargetScope,
        target_ids: &[i64],
    ) -> Result<Vec<CounterSnapshot>, AppError> {
        let found: HashMap<i64, CounterSnapshot> = self
            .stats
            .find_many(scope, target_ids)
            .await?
            .into_iter()
            .map(|s| (s.target_id, s))
            .collect();
        Ok(target_ids
            .iter()
            .map(|id| {
                found
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| CounterSnapshot::zeroed(scope, *id))
            })
            .collect())
    }

    /// 读持久层与缓冲区，不写缓存。
    ///
    /// 读取前后栅栏一致且都为偶数时，读到的持久值与缓冲值互补；否则重试，
    /// 仍不稳定时返回的值只能当次使用，第二项为 false。
    async fn compute(
        &self,
        scope: TargetScope,
        target_id: i64,
    ) -> Result<(CounterSnapshot, bool), AppError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let before = self.buffer.fences(scope.kinds()).await?;
            let snapshot = self.read_through(scope, target_id).await?;
            let after = self.buffer.fences(scope.kinds()).await?;
            let settled = before == after && before.iter().all(|f| f % 2 == 0);
            if settled || attempt >= SETTLE_ATTEMPTS {
                return Ok((snapshot, settled));
            }
            tokio::time::sleep(SETTLE_BACKOFF * attempt).await;
        }
    }

    async fn read_through(
        &self,
        scope: TargetScope,
        target_id: i64,
    ) -> Result<CounterSnapshot, AppError> {
        let mut snapshot = self
            .stats
            .find(scope, target_id)
            .await?
            .unwrap_or_else(|| CounterSnapshot::zeroed(scope, target_id));
        for kind in scope.kinds() {
            let pending = self.buffer.pending(*kind, target_id).await?;
            if pending != 0 {
                snapshot.apply(*kind, pending);
            }
        }
        Ok(snapshot)
    }

    /// 回源并写入缓存；并发回源时先写入者胜出，返回缓存中的最终值。
    /// 与刷盘交错而无法确认一致时不写缓存，交给下一次读取。
    pub async fn load(
        &self,
        scope: TargetScope,
        target_id: i64,
    ) -> Result<CounterSnapshot, AppError> {
        let (snapshot, settled) = self.compute(scope, target_id).await?;
        if !settled {
            debug!(
                "{} snapshot {} overlaps an in-flight flush, not cached",
                scope, target_id
            );
            return Ok(snapshot);
        }
        if self.counters.seed(&snapshot).await? {
            debug!("seeded {} snapshot {}", scope, target_id);
            return Ok(snapshot);
        }
        Ok(self
            .counters
            .read(scope, target_id)
            .await?
            .unwrap_or(snapshot))
    }
}
