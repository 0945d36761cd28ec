use super::InteractionStateStore;
use crate::error::AppError;
use domain::interaction::{InteractionRepository, RelationKind};
use domain::value::UserId;
use log::warn;
use std::collections::HashSet;
use std::sync::Arc;

/// 关系查询：先查缓存集合，集合缺失时从持久层重建
#[derive(Clone)]
pub struct RelationLookup {
    membership: InteractionStateStore,
    interactions: Arc<dyn InteractionRepository>,
}

impl RelationLookup {
    pub fn new(
        membership: InteractionStateStore,
        interactions: Arc<dyn InteractionRepository>,
    ) -> Self {
        Self {
            membership,
            interactions,
        }
    }

    pub fn membership(&self) -> &InteractionStateStore {
        &self.membership
    }

    pub async fn is_member(
        &self,
        user_id: UserId,
        kind: RelationKind,
        target_id: i64,
    ) -> Result<bool, AppError> {
        match self.membership.contains(user_id, kind, target_id).await {
            Ok(Some(hit)) => Ok(hit),
            Ok(None) => Ok(self.rebuild(user_id, kind).await?.contains(&target_id)),
            Err(e) => {
                warn!("membership cache read failed, falling back to db: {}", e);
                Ok(self.interactions.exists(user_id, kind, target_id).await?)
            }
        }
    }

    pub async fn check_many(
        &self,
        user_id: UserId,
        kind: RelationKind,
        target_ids: &[i64],
    ) -> Result<Vec<bool>, AppError> {
        if target_ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.membership.contains_many(user_id, kind, target_ids).await {
            Ok(Some(flags)) => Ok(flags),
            Ok(None) => {
                let members: HashSet<i64> = self.rebuild(user_id, kind).await?.into_iter().collect();
                Ok(target_ids.iter().map(|id| members.contains(id)).collect())
            }
            Err(e) => {
                warn!("membership cache read failed, falling back to db: {}", e);
                let members: HashSet<i64> = self
                    .interactions
                    .targets_of(user_id, kind)
                    .await?
                    .into_iter()
                    .collect();
                Ok(target_ids.iter().map(|id| members.contains(id)).collect())
            }
        }
    }

    pub async fn members(&self, user_id: UserId, kind: RelationKind) -> Result<Vec<i64>, AppError> {
        match self.membership.members(user_id, kind).await {
            Ok(Some(ids)) => Ok(ids),
            Ok(None) => self.rebuild(user_id, kind).await,
            Err(e) => {
                warn!("membership cache read failed, falling back to db: {}", e);
                Ok(self.interactions.targets_of(user_id, kind).await?)
            }
        }
    }

    /// 从持久层读出全部目标并回填缓存，回填失败不影响结果
    async fn rebuild(&self, user_id: UserId, kind: RelationKind) -> Result<Vec<i64>, AppError> {
        let targets = self.interactions.targets_of(user_id, kind).await?;
        if let Err(e) = self.membership.fill(user_id, kind, &targets).await {
            warn!("failed to refill {} set of user {}: {}", kind, user_id, e);
        }
        Ok(targets)
    }
}
