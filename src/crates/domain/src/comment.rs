use crate::value::{CommentId, UserId, VideoId};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use thiserror::Error;

const MAX_CONTENT_CHARS: usize = 1000;

#[derive(Error, Debug)]
pub enum CommentError {
    #[error("Database error: {0}")]
    DbErr(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Comment not found: {0}")]
    NotFound(CommentId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub video_id: VideoId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: NaiveDateTime,
}

impl Comment {
    pub fn new(
        id: CommentId,
        video_id: VideoId,
        user_id: UserId,
        content: impl Into<String>,
    ) -> Result<Self, CommentError> {
        let content = content.into().trim().to_string();
        if content.is_empty() {
            return Err(CommentError::ValidationError(
                "comment content is empty".to_string(),
            ));
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(CommentError::ValidationError(format!(
                "comment content exceeds {} characters",
                MAX_CONTENT_CHARS
            )));
        }
        Ok(Self {
            id,
            video_id,
            user_id,
            content,
            created_at: Utc::now().naive_utc(),
        })
    }
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// 写入评论，同时建立全零的评论计数行
    async fn create(&self, comment: &Comment) -> Result<(), CommentError>;
    async fn find_by_id(&self, id: CommentId) -> Result<Option<Comment>, CommentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_is_trimmed_and_validated() {
        let ok = Comment::new(
            CommentId::from(1),
            VideoId::from(2),
            UserId::from(3),
            "  nice  ",
        )
        .unwrap();
        assert_eq!(ok.content, "nice");

        let empty = Comment::new(CommentId::from(1), VideoId::from(2), UserId::from(3), "   ");
        assert!(matches!(empty, Err(CommentError::ValidationError(_))));

        let long = "x".repeat(MAX_CONTENT_CHARS + 1);
        assert!(Comment::new(CommentId::from(1), VideoId::from(2), UserId::from(3), long).is_err());
    }
}
