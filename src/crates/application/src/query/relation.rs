use crate::error::AppError;
use crate::store::RelationLookup;
use domain::interaction::RelationKind;
use domain::value::UserId;

/// 用户关系列表查询
#[derive(Clone)]
pub struct RelationQuery {
    lookup: RelationLookup,
}

impl RelationQuery {
    pub fn new(lookup: RelationLookup) -> Self {
        Self { lookup }
    }

    pub async fn liked_videos(&self, user_id: UserId) -> Result<Vec<i64>, AppError> {
        self.lookup.members(user_id, RelationKind::Like).await
    }

    pub async fn favorite_videos(&self, user_id: UserId) -> Result<Vec<i64>, AppError> {
        self.lookup.members(user_id, RelationKind::Favorite).await
    }

    pub async fn followings(&self, user_id: UserId) -> Result<Vec<i64>, AppError> {
        self.lookup.members(user_id, RelationKind::Follow).await
    }

    pub async fn is_following(&self, user_id: UserId, target: UserId) -> Result<bool, AppError> {
        if user_id == target {
            return Ok(false);
        }
        self.lookup
            .is_member(user_id, RelationKind::Follow, target.as_i64())
            .await
    }
}
