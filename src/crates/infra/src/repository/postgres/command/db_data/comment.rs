use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

use domain::comment::Comment;
use domain::value::{CommentId, UserId, VideoId};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, DeriveEntityModel, Default)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[sea_orm(column_type = "BigInteger")]
    pub id: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub video_id: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub user_id: i64,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Comment {
    fn from(model: Model) -> Self {
        Comment {
            id: CommentId::from(model.id),
            video_id: VideoId::from(model.video_id),
            user_id: UserId::from(model.user_id),
            content: model.content,
            created_at: model.created_at,
        }
    }
}

impl From<&Comment> for ActiveModel {
    fn from(comment: &Comment) -> Self {
        Self {
            id: Set(comment.id.as_i64()),
            video_id: Set(comment.video_id.as_i64()),
            user_id: Set(comment.user_id.as_i64()),
            content: Set(comment.content.clone()),
            created_at: Set(comment.created_at),
        }
    }
}
