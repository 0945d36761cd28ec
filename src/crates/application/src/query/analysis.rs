use crate::error::AppError;
use model::analysis::{EngagementTotals, StatAnalysisRepository};
use std::sync::Arc;

pub struct AnalysisQuery {
    repo: Arc<dyn StatAnalysisRepository>,
}

impl AnalysisQuery {
    pub fn new(repo: Arc<dyn StatAnalysisRepository>) -> Self {
        Self { repo }
    }

    /// 全站汇总只读持久层，不含尚未刷盘的增量
    pub async fn totals(&self) -> Result<EngagementTotals, AppError> {
        Ok(self.repo.totals().await?)
    }
}
