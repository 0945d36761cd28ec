use domain::behavior::{BehaviorLog, BehaviorLogRepository};
use log::{error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

const MAX_WRITE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct BehaviorLogSettings {
    pub queue_capacity: usize,
    pub workers: usize,
    pub batch_size: usize,
}

impl Default for BehaviorLogSettings {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            queue_capacity: 500,
            workers: cpus * 2,
            batch_size: 64,
        }
    }
}

/// 行为日志异步写入：有界队列加消费者池，队列满时丢弃并计数，调用方永不阻塞
pub struct BehaviorLogSink {
    sender: RwLock<Option<mpsc::Sender<BehaviorLog>>>,
    dropped: AtomicU64,
    written: Arc<AtomicU64>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl BehaviorLogSink {
    /// 需要在 tokio 运行时内调用
    pub fn start(repo: Arc<dyn BehaviorLogRepository>, settings: BehaviorLogSettings) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let written = Arc::new(AtomicU64::new(0));
        let batch_size = settings.batch_size.max(1);

        let workers = (0..settings.workers.max(1))
            .map(|worker| {
                let rx = rx.clone();
                let repo = repo.clone();
                let written = written.clone();
                tokio::spawn(async move {
                    run_worker(worker, rx, repo, batch_size, written).await;
                })
            })
            .collect();

        info!(
            "behavior log sink started: capacity={}, workers={}, batch={}",
            settings.queue_capacity, settings.workers, batch_size
        );
        Arc::new(Self {
            sender: RwLock::new(Some(tx)),
            dropped: AtomicU64::new(0),
            written,
            workers: Mutex::new(workers),
        })
    }

    /// 非阻塞投递，返回是否入队
    pub fn submit(&self, entry: BehaviorLog) -> bool {
        let guard = self.sender.read();
        let result = match guard.as_ref() {
            Some(tx) => tx.try_send(entry),
            None => return self.record_drop("sink is shut down"),
        };
        match result {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => self.record_drop("queue full"),
            Err(TrySendError::Closed(_)) => self.record_drop("queue closed"),
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// 关闭队列并等待消费者写完剩余日志
    pub async fn shutdown(&self) {
        drop(self.sender.write().take());
        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Task failed: {}", e);
            }
        }
        info!(
            "behavior log sink stopped: written={}, dropped={}",
            self.written(),
            self.dropped()
        );
    }

    fn record_drop(&self, reason: &str) -> bool {
        let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        if n == 1 || n % 1000 == 0 {
            warn!("behavior log dropped ({}), total dropped: {}", reason, n);
        }
        false
    }
}

async fn run_worker(
    worker: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<BehaviorLog>>>,
    repo: Arc<dyn BehaviorLogRepository>,
    batch_size: usize,
    written: Arc<AtomicU64>,
) {
    loop {
        let batch = {
            let mut rx = rx.lock().await;
            let first = match rx.recv().await {
                Some(entry) => entry,
                None => break,
            };
            let mut batch = Vec::with_capacity(batch_size);
            batch.push(first);
            while batch.len() < batch_size {
                match rx.try_recv() {
                    Ok(entry) => batch.push(entry),
                    Err(_) => break,
                }
            }
            batch
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match repo.append_batch(&batch).await {
                Ok(()) => {
                    written.fetch_add(batch.len() as u64, Ordering::Relaxed);
                    break;
                }
                Err(e) if attempt < MAX_WRITE_ATTEMPTS => {
                    warn!(
                        "[log-worker-{}] append failed (attempt {}): {}",
                        worker, attempt, e
                    );
                    tokio::time::sleep(Duration::from_millis(50 * attempt as u64)).await;
                }
                Err(e) => {
                    error!(
                        "[log-worker-{}] dropping {} behavior logs after {} attempts: {}",
                        worker,
                        batch.len(),
                        attempt,
                        e
                    );
                    break;
                }
            }
        }
    }
}
