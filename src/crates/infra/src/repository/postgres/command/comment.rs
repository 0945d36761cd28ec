use super::db_data::{comment, comment_stat};
use async_trait::async_trait;
use domain::comment::{Comment, CommentError, CommentRepository};
use domain::value::CommentId;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

#[derive(Clone)]
pub struct CommentRepositoryImpl {
    db: sea_orm::DbConn,
}

impl CommentRepositoryImpl {
    pub fn new(db: sea_orm::DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CommentRepository for CommentRepositoryImpl {
    async fn create(&self, comment: &Comment) -> Result<(), CommentError> {
        let comment_model: comment::ActiveModel = comment.into();
        let stat_model = comment_stat::ActiveModel {
            comment_id: Set(comment.id.as_i64()),
            like_count: Set(0),
        };

        self.db
            .transaction::<_, (), DbErr>(|txn| {
                Box::pin(async move {
                    comment::Entity::insert(comment_model)
                        .exec_without_returning(txn)
                        .await?;
                    // 评论计数行与评论同事务建立
                    comment_stat::Entity::insert(stat_model)
                        .on_conflict(
                            OnConflict::column(comment_stat::Column::CommentId)
                                .do_nothing()
                                .to_owned(),
                        )
                        .exec_without_returning(txn)
                        .await?;
                    Ok(())
                })
            })
            .await
            .map_err(|e| CommentError::DbErr(e.to_string()))
    }

    async fn find_by_id(&self, id: CommentId) -> Result<Option<Comment>, CommentError> {
        let row: Option<comment::Model> = comment::Entity::find_by_id(id.as_i64())
            .one(&self.db)
            .await
            .map_err(|e| CommentError::DbErr(e.to_string()))?;
        Ok(row.map(|m| m.into()))
    }
}
