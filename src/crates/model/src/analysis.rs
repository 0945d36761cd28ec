use crate::ModelError;
use async_trait::async_trait;
use serde::Serialize;

/// 全站计数汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngagementTotals {
    pub play_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub share_count: i64,
    pub favorite_count: i64,
}

#[async_trait]
pub trait StatAnalysisRepository: Send + Sync {
    async fn totals(&self) -> Result<EngagementTotals, ModelError>;
}
