use super::db_data::user_behavior;
use async_trait::async_trait;
use domain::behavior::{BehaviorError, BehaviorLog, BehaviorLogRepository};
use sea_orm::*;

#[derive(Clone)]
pub struct BehaviorLogRepositoryImpl {
    db: sea_orm::DbConn,
}

impl BehaviorLogRepositoryImpl {
    pub fn new(db: sea_orm::DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BehaviorLogRepository for BehaviorLogRepositoryImpl {
    async fn append_batch(&self, entries: &[BehaviorLog]) -> Result<(), BehaviorError> {
        if entries.is_empty() {
            return Ok(());
        }
        let models: Vec<user_behavior::ActiveModel> = entries.iter().map(Into::into).collect();
        user_behavior::Entity::insert_many(models)
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| BehaviorError::DbErr(e.to_string()))?;
        Ok(())
    }
}
