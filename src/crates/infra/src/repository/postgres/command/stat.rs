use super::db_data::{comment_stat, video_stat};
use async_trait::async_trait;
use domain::counter::{CounterError, CounterKind, CounterSnapshot, StatRepository, TargetScope};
use sea_orm::*;

/// 计数器落在哪张表的哪一列
struct StatColumn {
    table: &'static str,
    key: &'static str,
    count: &'static str,
}

fn table_of(scope: TargetScope) -> (&'static str, &'static str) {
    match scope {
        TargetScope::Video => ("video_stat", "video_id"),
        TargetScope::Comment => ("comment_stat", "comment_id"),
    }
}

fn column_of(kind: CounterKind) -> StatColumn {
    let (table, key) = table_of(kind.scope());
    let count = match kind {
        CounterKind::Play => "play_count",
        CounterKind::Like | CounterKind::CommentLike => "like_count",
        CounterKind::Comment => "comment_count",
        CounterKind::Share => "share_count",
        CounterKind::Favorite => "favorite_count",
    };
    StatColumn { table, key, count }
}

fn db_err(e: impl ToString) -> CounterError {
    CounterError::DbErr(e.to_string())
}

#[derive(Clone)]
pub struct StatRepositoryImpl {
    db: sea_orm::DbConn,
}

impl StatRepositoryImpl {
    pub fn new(db: sea_orm::DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StatRepository for StatRepositoryImpl {
    async fn create(&self, scope: TargetScope, target_id: i64) -> Result<(), CounterError> {
        let (table, key) = table_of(scope);
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!(
                "INSERT INTO {table} ({key}) VALUES ($1) ON CONFLICT ({key}) DO NOTHING"
            ),
            [target_id.into()],
        );
        self.db.execute(stmt).await.map_err(db_err)?;
        Ok(())
    }

    async fn find(
        &self,
        scope: TargetScope,
        target_id: i64,
    ) -> Result<Option<CounterSnapshot>, CounterError> {
        let mut rows = self.find_many(scope, &[target_id]).await?;
        Ok(rows.pop())
    }

    async fn find_many(
        &self,
        scope: TargetScope,
        target_ids: &[i64],
    ) -> Result<Vec<CounterSnapshot>, CounterError> {
        if target_ids.is_empty() {
            return Ok(Vec::new());
        }
        match scope {
            TargetScope::Video => {
                let rows = video_stat::Entity::find()
                    .filter(video_stat::Column::VideoId.is_in(target_ids.to_vec()))
                    .all(&self.db)
                    .await
                    .map_err(db_err)?;
                Ok(rows.into_iter().map(CounterSnapshot::from).collect())
            }
            TargetScope::Comment => {
                let rows = comment_stat::Entity::find()
                    .filter(comment_stat::Column::CommentId.is_in(target_ids.to_vec()))
                    .all(&self.db)
                    .await
                    .map_err(db_err)?;
                Ok(rows.into_iter().map(CounterSnapshot::from).collect())
            }
        }
    }

    async fn increment(
        &self,
        kind: CounterKind,
        target_id: i64,
        delta: i64,
    ) -> Result<(), CounterError> {
        let StatColumn { table, key, count } = column_of(kind);
        // 计数不会被减到负数
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!(
                "INSERT INTO {table} ({key}, {count}) VALUES ($1, GREATEST($2, 0)) \
                 ON CONFLICT ({key}) DO UPDATE SET {count} = GREATEST({table}.{count} + $2, 0)"
            ),
            [target_id.into(), delta.into()],
        );
        self.db.execute(stmt).await.map_err(db_err)?;
        Ok(())
    }

    async fn apply_deltas(
        &self,
        kind: CounterKind,
        deltas: &[(i64, i64)],
    ) -> Result<u64, CounterError> {
        if deltas.is_empty() {
            return Ok(0);
        }
        let StatColumn { table, key, count } = column_of(kind);
        let ids: Vec<i64> = deltas.iter().map(|(id, _)| *id).collect();
        let values: Vec<i64> = deltas.iter().map(|(_, d)| *d).collect();

        let ensure_rows = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!(
                "INSERT INTO {table} ({key}) SELECT UNNEST($1::bigint[]) \
                 ON CONFLICT ({key}) DO NOTHING"
            ),
            [Value::from(ids.clone())],
        );
        let merge = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!(
                "UPDATE {table} AS s SET {count} = GREATEST(s.{count} + d.delta, 0) \
                 FROM UNNEST($1::bigint[], $2::bigint[]) AS d(target_id, delta) \
                 WHERE s.{key} = d.target_id"
            ),
            [Value::from(ids), Value::from(values)],
        );

        self.db
            .transaction::<_, u64, DbErr>(|txn| {
                Box::pin(async move {
                    txn.execute(ensure_rows).await?;
                    let result = txn.execute(merge).await?;
                    Ok(result.rows_affected())
                })
            })
            .await
            .map_err(db_err)
    }

    async fn overwrite(
        &self,
        kind: CounterKind,
        target_id: i64,
        value: i64,
    ) -> Result<(), CounterError> {
        if value < 0 {
            return Err(CounterError::InvalidOperation(format!(
                "{} cannot be negative: {}",
                kind, value
            )));
        }
        let StatColumn { table, key, count } = column_of(kind);
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!(
                "INSERT INTO {table} ({key}, {count}) VALUES ($1, $2) \
                 ON CONFLICT ({key}) DO UPDATE SET {count} = EXCLUDED.{count}"
            ),
            [target_id.into(), value.into()],
        );
        self.db.execute(stmt).await.map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_follow_counter_scope() {
        let like = column_of(CounterKind::Like);
        assert_eq!((like.table, like.key, like.count), ("video_stat", "video_id", "like_count"));

        let comment_like = column_of(CounterKind::CommentLike);
        assert_eq!(
            (comment_like.table, comment_like.key, comment_like.count),
            ("comment_stat", "comment_id", "like_count")
        );
        assert_eq!(column_of(CounterKind::Favorite).count, "favorite_count");
    }
}
