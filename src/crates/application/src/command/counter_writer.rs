use super::policy::{CounterPolicy, WriteMode};
use crate::error::AppError;
use crate::store::{CounterStore, DeltaBuffer, SnapshotLoader};
use domain::counter::{CounterKind, StatRepository};
use log::warn;
use std::sync::Arc;

/// 写路径上的计数更新：先改缓存快照，再按策略写缓冲区或持久层
#[derive(Clone)]
pub struct CounterWriter {
    counters: CounterStore,
    buffer: DeltaBuffer,
    loader: SnapshotLoader,
    stats: Arc<dyn StatRepository>,
    policy: CounterPolicy,
}

impl CounterWriter {
    pub fn new(
        counters: CounterStore,
        buffer: DeltaBuffer,
        loader: SnapshotLoader,
        stats: Arc<dyn StatRepository>,
        policy: CounterPolicy,
    ) -> Self {
        Self {
            counters,
            buffer,
            loader,
            stats,
            policy,
        }
    }

    pub fn policy(&self) -> &CounterPolicy {
        &self.policy
    }

    /// 任一步失败都会撤销已生效的缓存计数，调用方可以安全重试
    pub async fn apply(
        &self,
        kind: CounterKind,
        target_id: i64,
        delta: i64,
    ) -> Result<(), AppError> {
        let bumped = self.bump_snapshot(kind, target_id, delta).await?;

        let durable = match self.policy.mode(kind) {
            WriteMode::Buffered => self
                .buffer
                .accumulate(kind, target_id, delta)
                .await
                .map(|_| ())
                .map_err(AppError::from),
            WriteMode::Synchronous => self
                .stats
                .increment(kind, target_id, delta)
                .await
                .map_err(AppError::from),
        };

        if let Err(e) = durable {
            if !bumped {
                return Err(e);
            }
            if let Err(undo) = self
                .counters
                .increment_existing(kind, target_id, -delta)
                .await
            {
                warn!(
                    "[{}] failed to revert cached counter of {}: {}",
                    kind, target_id, undo
                );
            }
            return Err(e);
        }
        Ok(())
    }

    /// 返回是否改动了缓存快照
    async fn bump_snapshot(
        &self,
        kind: CounterKind,
        target_id: i64,
        delta: i64,
    ) -> Result<bool, AppError> {
        if self
            .counters
            .increment_existing(kind, target_id, delta)
            .await?
            .is_some()
        {
            return Ok(true);
        }
        self.loader.load(kind.scope(), target_id).await?;
        // 回源时恰逢刷盘未写缓存，或快照又被淘汰：只写缓冲区，由下一次回源带上本次增量
        Ok(self
            .counters
            .increment_existing(kind, target_id, delta)
            .await?
            .is_some())
    }
}
