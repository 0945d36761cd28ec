use async_trait::async_trait;
use domain::behavior::{BehaviorError, BehaviorLog, BehaviorLogRepository, BehaviorType};
use domain::value::{UserId, VideoId};
use model::behavior_history::BehaviorHistoryRepository;
use model::ModelError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// 内存版行为日志，同时提供历史查询
#[derive(Clone, Default)]
pub struct InMemoryBehaviorLogRepository {
    entries: Arc<RwLock<Vec<BehaviorLog>>>,
}

impl InMemoryBehaviorLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// 去重后按最近一次行为倒序
    fn distinct_videos(&self, user_id: UserId, behavior: BehaviorType) -> Vec<VideoId> {
        let entries = self.entries.read();
        let mut latest: HashMap<VideoId, usize> = HashMap::new();
        for (pos, entry) in entries.iter().enumerate() {
            if entry.user_id == user_id && entry.behavior == behavior {
                latest.insert(entry.video_id, pos);
            }
        }
        let mut videos: Vec<(VideoId, usize)> = latest.into_iter().collect();
        videos.sort_by(|a, b| {
            let ta = entries[a.1].created_at;
            let tb = entries[b.1].created_at;
            (tb, b.1).cmp(&(ta, a.1))
        });
        videos.into_iter().map(|(id, _)| id).collect()
    }
}

#[async_trait]
impl BehaviorLogRepository for InMemoryBehaviorLogRepository {
    async fn append_batch(&self, entries: &[BehaviorLog]) -> Result<(), BehaviorError> {
        self.entries.write().extend_from_slice(entries);
        Ok(())
    }
}

#[async_trait]
impl BehaviorHistoryRepository for InMemoryBehaviorLogRepository {
    async fn recent_video_ids(
        &self,
        user_id: UserId,
        behavior: BehaviorType,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<VideoId>, ModelError> {
        Ok(self
            .distinct_videos(user_id, behavior)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_distinct_videos(
        &self,
        user_id: UserId,
        behavior: BehaviorType,
    ) -> Result<u64, ModelError> {
        Ok(self.distinct_videos(user_id, behavior).len() as u64)
    }
}
