use crate::error::AppError;
use crate::store::DeltaBuffer;
use domain::counter::{CounterKind, StatRepository};
use futures::future::join_all;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub kind: CounterKind,
    pub targets: usize,
    pub net_delta: i64,
    pub rows: u64,
}

impl FlushReport {
    fn empty(kind: CounterKind) -> Self {
        Self {
            kind,
            targets: 0,
            net_delta: 0,
            rows: 0,
        }
    }
}

/// 定时把各计数器缓冲区合并进持久层。
///
/// 每种计数器一个独立循环，同一种计数器的刷盘串行，不同种类互不阻塞。
pub struct BufferFlushScheduler {
    buffer: DeltaBuffer,
    stats: Arc<dyn StatRepository>,
    interval: Duration,
    locks: HashMap<CounterKind, Arc<Mutex<()>>>,
    shutdown: watch::Sender<bool>,
    handles: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl BufferFlushScheduler {
    pub fn new(buffer: DeltaBuffer, stats: Arc<dyn StatRepository>, interval: Duration) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        let locks = CounterKind::ALL
            .iter()
            .map(|k| (*k, Arc::new(Mutex::new(()))))
            .collect();
        Arc::new(Self {
            buffer,
            stats,
            interval,
            locks,
            shutdown,
            handles: parking_lot::Mutex::new(Vec::new()),
        })
    }

    pub fn start(self: &Arc<Self>) {
        let mut handles = self.handles.lock();
        for kind in CounterKind::ALL {
            let this = self.clone();
            let mut stop = self.shutdown.subscribe();
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(this.interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // 第一次 tick 立即返回，跳过
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = ticker.tick() => this.run_cycle(kind).await,
                        changed = stop.changed() => {
                            if changed.is_err() || *stop.borrow() {
                                break;
                            }
                        }
                    }
                }
                debug!("[{}] flush loop stopped", kind);
            }));
        }
        info!(
            "buffer flush scheduler started: {} kinds every {:?}",
            CounterKind::ALL.len(),
            self.interval
        );
    }

    /// 单轮刷盘放进独立任务，panic 也不会终止循环
    async fn run_cycle(self: &Arc<Self>, kind: CounterKind) {
        let this = self.clone();
        let handle = tokio::spawn(async move { this.flush_once(kind).await });
        match handle.await {
            Ok(Ok(report)) if report.targets > 0 => info!(
                "[{}] flushed {} targets, net delta {}",
                kind, report.targets, report.net_delta
            ),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => error!("[{}] flush failed: {}", kind, e),
            Err(e) => error!("Task failed: {}", e),
        }
    }

    pub(crate) fn buffer(&self) -> &DeltaBuffer {
        &self.buffer
    }

    /// 同种计数器的刷盘锁，持有期间本进程不会刷该种计数器
    pub(crate) async fn lock_kind(
        &self,
        kind: CounterKind,
    ) -> Result<OwnedMutexGuard<()>, AppError> {
        let lock = self
            .locks
            .get(&kind)
            .cloned()
            .ok_or_else(|| AppError::FlushError(format!("no flush lock for {}", kind)))?;
        Ok(lock.lock_owned().await)
    }

    /// 认领、合并、删除临时键；合并失败时把增量并回缓冲区
    pub async fn flush_once(&self, kind: CounterKind) -> Result<FlushReport, AppError> {
        let _guard = self.lock_kind(kind).await?;
        self.flush_locked(kind).await
    }

    /// 调用方须持有 `lock_kind` 返回的锁
    pub(crate) async fn flush_locked(&self, kind: CounterKind) -> Result<FlushReport, AppError> {
        let claimed = match self.buffer.claim(kind).await? {
            Some(claimed) => claimed,
            None => return Ok(FlushReport::empty(kind)),
        };
        if claimed.deltas.is_empty() {
            self.buffer.release(&claimed).await?;
            return Ok(FlushReport::empty(kind));
        }

        match self.stats.apply_deltas(kind, &claimed.deltas).await {
            Ok(rows) => {
                if let Err(e) = self.buffer.release(&claimed).await {
                    warn!(
                        "[{}] merged but failed to delete {}, it will expire: {}",
                        kind, claimed.claim_key, e
                    );
                }
                Ok(FlushReport {
                    kind,
                    targets: claimed.deltas.len(),
                    net_delta: claimed.total(),
                    rows,
                })
            }
            Err(e) => {
                match self.buffer.restore(&claimed).await {
                    Ok(()) => warn!(
                        "[{}] restored {} deltas for the next cycle",
                        kind,
                        claimed.deltas.len()
                    ),
                    Err(restore_err) => error!(
                        "[{}] failed to restore {} deltas, they expire with {}: {}",
                        kind,
                        claimed.deltas.len(),
                        claimed.claim_key,
                        restore_err
                    ),
                }
                Err(AppError::FlushError(format!("{}: {}", kind, e)))
            }
        }
    }

    /// 所有种类并行刷一次，失败只记录日志
    pub async fn flush_all(&self) -> Vec<FlushReport> {
        let results = join_all(CounterKind::ALL.iter().map(|k| self.flush_once(*k))).await;
        results
            .into_iter()
            .zip(CounterKind::ALL)
            .filter_map(|(result, kind)| match result {
                Ok(report) => Some(report),
                Err(e) => {
                    error!("[{}] flush failed: {}", kind, e);
                    None
                }
            })
            .collect()
    }

    /// 停止定时循环并做最后一次刷盘
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Task failed: {}", e);
            }
        }
        let reports = self.flush_all().await;
        let targets: usize = reports.iter().map(|r| r.targets).sum();
        info!("final flush merged {} targets", targets);
    }
}
