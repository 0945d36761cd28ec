use async_trait::async_trait;
use dashmap::DashMap;
use domain::comment::{Comment, CommentError, CommentRepository};
use domain::counter::{StatRepository, TargetScope};
use domain::value::CommentId;
use std::sync::Arc;

/// 内存版评论表，建评论时同步建立评论计数行
#[derive(Clone)]
pub struct InMemoryCommentRepository {
    store: Arc<DashMap<CommentId, Comment>>,
    stats: Arc<dyn StatRepository>,
}

impl InMemoryCommentRepository {
    pub fn new(stats: Arc<dyn StatRepository>) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            stats,
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<(), CommentError> {
        if self.store.contains_key(&comment.id) {
            return Err(CommentError::DbErr(format!(
                "duplicate comment id {}",
                comment.id
            )));
        }
        self.stats
            .create(TargetScope::Comment, comment.id.as_i64())
            .await
            .map_err(|e| CommentError::DbErr(e.to_string()))?;
        self.store.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: CommentId) -> Result<Option<Comment>, CommentError> {
        Ok(self.store.get(&id).map(|c| c.clone()))
    }
}
