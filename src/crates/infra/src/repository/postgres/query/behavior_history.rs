use async_trait::async_trait;
use domain::behavior::BehaviorType;
use domain::value::{UserId, VideoId};
use model::behavior_history::BehaviorHistoryRepository;
use model::ModelError;
use sea_orm::*;

pub struct BehaviorHistoryRepositoryImpl {
    db: DatabaseConnection,
}

impl BehaviorHistoryRepositoryImpl {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BehaviorHistoryRepository for BehaviorHistoryRepositoryImpl {
    async fn recent_video_ids(
        &self,
        user_id: UserId,
        behavior: BehaviorType,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<VideoId>, ModelError> {
        // 同一视频只保留最近一次行为
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT video_id FROM user_behavior \
             WHERE user_id = $1 AND behavior_type = $2 \
             GROUP BY video_id ORDER BY MAX(created_at) DESC, video_id DESC \
             LIMIT $3 OFFSET $4",
            [
                user_id.as_i64().into(),
                behavior.code().into(),
                (limit as i64).into(),
                (offset as i64).into(),
            ],
        );
        let rows = self
            .db
            .query_all(stmt)
            .await
            .map_err(|e| ModelError::QueryError(e.to_string()))?;
        rows.iter()
            .map(|row| {
                row.try_get::<i64>("", "video_id")
                    .map(VideoId::from)
                    .map_err(|e| ModelError::QueryError(e.to_string()))
            })
            .collect()
    }

    async fn count_distinct_videos(
        &self,
        user_id: UserId,
        behavior: BehaviorType,
    ) -> Result<u64, ModelError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT COUNT(DISTINCT video_id)::bigint AS total FROM user_behavior \
             WHERE user_id = $1 AND behavior_type = $2",
            [user_id.as_i64().into(), behavior.code().into()],
        );
        let row = self
            .db
            .query_one(stmt)
            .await
            .map_err(|e| ModelError::QueryError(e.to_string()))?;
        let total = match row {
            Some(row) => row
                .try_get::<i64>("", "total")
                .map_err(|e| ModelError::QueryError(e.to_string()))?,
            None => 0,
        };
        Ok(total.max(0) as u64)
    }
}
