use async_trait::async_trait;
use model::analysis::{EngagementTotals, StatAnalysisRepository};
use model::ModelError;
use sea_orm::*;

#[derive(Debug, FromQueryResult)]
struct TotalsRow {
    play_count: i64,
    like_count: i64,
    comment_count: i64,
    share_count: i64,
    favorite_count: i64,
}

pub struct StatAnalysisRepositoryImpl {
    db: DatabaseConnection,
}

impl StatAnalysisRepositoryImpl {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StatAnalysisRepository for StatAnalysisRepositoryImpl {
    async fn totals(&self) -> Result<EngagementTotals, ModelError> {
        let stmt = Statement::from_string(
            DbBackend::Postgres,
            "SELECT COALESCE(SUM(play_count), 0)::bigint AS play_count, \
             COALESCE(SUM(like_count), 0)::bigint AS like_count, \
             COALESCE(SUM(comment_count), 0)::bigint AS comment_count, \
             COALESCE(SUM(share_count), 0)::bigint AS share_count, \
             COALESCE(SUM(favorite_count), 0)::bigint AS favorite_count \
             FROM video_stat",
        );
        let row = TotalsRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(|e| ModelError::QueryError(e.to_string()))?;
        Ok(row
            .map(|r| EngagementTotals {
                play_count: r.play_count,
                like_count: r.like_count,
                comment_count: r.comment_count,
                share_count: r.share_count,
                favorite_count: r.favorite_count,
            })
            .unwrap_or_default())
    }
}
