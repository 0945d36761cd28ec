use crate::ModelError;
use async_trait::async_trait;
use domain::behavior::BehaviorType;
use domain::value::{UserId, VideoId};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryPage {
    pub video_ids: Vec<i64>,
    pub total: u64,
    pub page: u64,
    pub size: u64,
}

#[async_trait]
pub trait BehaviorHistoryRepository: Send + Sync {
    /// 去重后的视频 ID，按最近一次行为时间倒序
    async fn recent_video_ids(
        &self,
        user_id: UserId,
        behavior: BehaviorType,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<VideoId>, ModelError>;

    async fn count_distinct_videos(
        &self,
        user_id: UserId,
        behavior: BehaviorType,
    ) -> Result<u64, ModelError>;
}
