use crate::error::AppError;
use domain::behavior::BehaviorType;
use domain::value::UserId;
use model::behavior_history::{BehaviorHistoryRepository, HistoryPage};
use std::sync::Arc;

const MAX_PAGE_SIZE: u64 = 100;

pub struct HistoryQuery {
    repo: Arc<dyn BehaviorHistoryRepository>,
}

impl HistoryQuery {
    pub fn new(repo: Arc<dyn BehaviorHistoryRepository>) -> Self {
        Self { repo }
    }

    /// page 从 1 开始
    pub async fn recent(
        &self,
        user_id: UserId,
        behavior: BehaviorType,
        page: u64,
        size: u64,
    ) -> Result<HistoryPage, AppError> {
        if page == 0 || size == 0 {
            return Err(AppError::InvalidInput(
                "page and size must be positive".to_string(),
            ));
        }
        let size = size.min(MAX_PAGE_SIZE);
        let total = self.repo.count_distinct_videos(user_id, behavior).await?;
        let video_ids = if (page - 1) * size >= total {
            Vec::new()
        } else {
            self.repo
                .recent_video_ids(user_id, behavior, (page - 1) * size, size)
                .await?
                .into_iter()
                .map(|v| v.as_i64())
                .collect()
        };
        Ok(HistoryPage {
            video_ids,
            total,
            page,
            size,
        })
    }
}
