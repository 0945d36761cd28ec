use crate::error::AppError;

/// 全局唯一 ID 生成器
#[async_trait::async_trait]
pub trait IdGenerator: Send + Sync {
    async fn next_id(&self) -> Result<i64, AppError>;
}
