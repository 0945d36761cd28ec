use crate::cache::CacheError;
use domain::behavior::BehaviorError;
use domain::comment::CommentError;
use domain::counter::CounterError;
use domain::interaction::InteractionError;
use model::ModelError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// 缓存主写失败，调用方可重试
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),
    #[error("Counter error: {0}")]
    CounterError(#[from] CounterError),
    #[error("Interaction error: {0}")]
    InteractionError(#[from] InteractionError),
    #[error("Behavior error: {0}")]
    BehaviorError(#[from] BehaviorError),
    #[error("Comment error: {0}")]
    CommentError(#[from] CommentError),
    #[error("Model error: {0}")]
    ModelError(#[from] ModelError),
    #[error("Flush error: {0}")]
    FlushError(String),
    #[error("Unknown error: {0}")]
    UnknownError(String),
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        AppError::CacheUnavailable(e.to_string())
    }
}

impl AppError {
    /// 临时性错误，重试可能成功
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::CacheUnavailable(_) | AppError::FlushError(_))
    }
}
