use crate::cache::{CacheBackend, CacheError, Claim, KeySpace};
use domain::counter::CounterKind;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// 一次认领出来的增量批次
#[derive(Debug, Clone)]
pub struct ClaimedDeltas {
    pub kind: CounterKind,
    pub claim_key: String,
    /// (target_id, delta)，已剔除零值
    pub deltas: Vec<(i64, i64)>,
}

impl ClaimedDeltas {
    pub fn total(&self) -> i64 {
        self.deltas.iter().map(|(_, d)| *d).sum()
    }
}

/// 每种计数器一个待刷盘增量哈希，target_id -> 有符号增量。
///
/// 认领通过改名完成：写入方要么落在旧键（被本轮认领），要么落在新键（留给下一轮）。
/// 认领与结束都会推进该种计数器的栅栏，回源方据此判断读到的持久值与缓冲值是否错位。
#[derive(Clone)]
pub struct DeltaBuffer {
    cache: Arc<dyn CacheBackend>,
    keys: KeySpace,
    claim_ttl: Duration,
}

impl DeltaBuffer {
    pub fn new(cache: Arc<dyn CacheBackend>, keys: KeySpace, claim_ttl: Duration) -> Self {
        Self {
            cache,
            keys,
            claim_ttl,
        }
    }

    pub async fn accumulate(
        &self,
        kind: CounterKind,
        target_id: i64,
        delta: i64,
    ) -> Result<i64, CacheError> {
        self.cache
            .hash_incr(&self.keys.buffer(kind), &target_id.to_string(), delta)
            .await
    }

    /// 活动缓冲区中尚未刷盘的增量
    pub async fn pending(&self, kind: CounterKind, target_id: i64) -> Result<i64, CacheError> {
        Ok(self
            .cache
            .hash_get(&self.keys.buffer(kind), &target_id.to_string())
            .await?
            .unwrap_or(0))
    }

    /// 改名认领并读出全部增量；缓冲区为空或上一次认领未结束时返回 None
    pub async fn claim(&self, kind: CounterKind) -> Result<Option<ClaimedDeltas>, CacheError> {
        let claim_key = self.keys.claim(kind, &Uuid::new_v4().simple().to_string());
        // 临时键与栅栏在同一次原子操作里带上过期时间，进程崩溃后最多保留 claim_ttl
        let raw = match self
            .cache
            .hash_claim(
                &self.keys.buffer(kind),
                &claim_key,
                &self.keys.fence(kind),
                self.claim_ttl,
            )
            .await?
        {
            Claim::Taken(raw) => raw,
            Claim::Empty => return Ok(None),
            Claim::Busy => {
                debug!("[{}] previous claim still in flight, skip", kind);
                return Ok(None);
            }
        };

        let mut deltas = Vec::with_capacity(raw.len());
        for (field, delta) in raw {
            match field.parse::<i64>() {
                Ok(id) if delta != 0 => deltas.push((id, delta)),
                Ok(_) => {}
                Err(_) => warn!("[{}] skip malformed buffer field {}", kind, field),
            }
        }
        deltas.sort_unstable_by_key(|(id, _)| *id);
        Ok(Some(ClaimedDeltas {
            kind,
            claim_key,
            deltas,
        }))
    }

    /// 合并成功后删除临时键并关闭栅栏
    pub async fn release(&self, claimed: &ClaimedDeltas) -> Result<(), CacheError> {
        self.cache
            .claim_finish(&claimed.claim_key, &self.keys.fence(claimed.kind))
            .await
    }

    /// 合并失败时把增量并回活动缓冲区
    pub async fn restore(&self, claimed: &ClaimedDeltas) -> Result<(), CacheError> {
        if !claimed.deltas.is_empty() {
            let fields: Vec<(String, i64)> = claimed
                .deltas
                .iter()
                .map(|(id, d)| (id.to_string(), *d))
                .collect();
            self.cache
                .hash_incr_many(&self.keys.buffer(claimed.kind), &fields)
                .await?;
        }
        self.release(claimed).await
    }

    /// 各种计数器当前的栅栏值，顺序与入参一致
    pub async fn fences(&self, kinds: &[CounterKind]) -> Result<Vec<i64>, CacheError> {
        let keys: Vec<String> = kinds.iter().map(|k| self.keys.fence(*k)).collect();
        self.cache.fence_get_many(&keys).await
    }
}
