use super::db_data::{interaction, interaction::ActiveModel, interaction::Entity};
use async_trait::async_trait;
use domain::interaction::{Interaction, InteractionError, InteractionRepository, RelationKind};
use domain::value::UserId;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::*;
use std::collections::HashMap;

fn db_err(e: DbErr) -> InteractionError {
    InteractionError::DbErr(e.to_string())
}

#[derive(Clone)]
pub struct InteractionRepositoryImpl {
    db: sea_orm::DbConn,
}

impl InteractionRepositoryImpl {
    pub fn new(db: sea_orm::DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InteractionRepository for InteractionRepositoryImpl {
    async fn insert(&self, row: &Interaction) -> Result<bool, InteractionError> {
        let active_model: ActiveModel = row.into();
        let inserted = Entity::insert(active_model)
            .on_conflict(
                OnConflict::columns([
                    interaction::Column::UserId,
                    interaction::Column::Kind,
                    interaction::Column::TargetId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await;

        match inserted {
            Ok(rows) => Ok(rows > 0),
            Err(DbErr::RecordNotInserted) => Ok(false),
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Ok(false),
                _ => Err(db_err(e)),
            },
        }
    }

    async fn delete(
        &self,
        user_id: UserId,
        kind: RelationKind,
        target_id: i64,
    ) -> Result<bool, InteractionError> {
        let result = Entity::delete_many()
            .filter(interaction::Column::UserId.eq(user_id.as_i64()))
            .filter(interaction::Column::Kind.eq(kind.name()))
            .filter(interaction::Column::TargetId.eq(target_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn exists(
        &self,
        user_id: UserId,
        kind: RelationKind,
        target_id: i64,
    ) -> Result<bool, InteractionError> {
        let count = Entity::find()
            .filter(interaction::Column::UserId.eq(user_id.as_i64()))
            .filter(interaction::Column::Kind.eq(kind.name()))
            .filter(interaction::Column::TargetId.eq(target_id))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn targets_of(
        &self,
        user_id: UserId,
        kind: RelationKind,
    ) -> Result<Vec<i64>, InteractionError> {
        Entity::find()
            .select_only()
            .column(interaction::Column::TargetId)
            .filter(interaction::Column::UserId.eq(user_id.as_i64()))
            .filter(interaction::Column::Kind.eq(kind.name()))
            .order_by_desc(interaction::Column::CreatedAt)
            .into_tuple::<i64>()
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    async fn count_by_targets(
        &self,
        kind: RelationKind,
        target_ids: &[i64],
    ) -> Result<HashMap<i64, i64>, InteractionError> {
        if target_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(i64, i64)> = Entity::find()
            .select_only()
            .column(interaction::Column::TargetId)
            .column_as(Expr::col(interaction::Column::UserId).count(), "total")
            .filter(interaction::Column::Kind.eq(kind.name()))
            .filter(interaction::Column::TargetId.is_in(target_ids.to_vec()))
            .group_by(interaction::Column::TargetId)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().collect())
    }
}
