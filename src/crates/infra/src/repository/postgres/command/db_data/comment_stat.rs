use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use domain::counter::{CounterKind, CounterSnapshot, TargetScope};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, DeriveEntityModel, Default)]
#[sea_orm(table_name = "comment_stat")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[sea_orm(column_type = "BigInteger")]
    pub comment_id: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub like_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for CounterSnapshot {
    fn from(model: Model) -> Self {
        CounterSnapshot::zeroed(TargetScope::Comment, model.comment_id)
            .with(CounterKind::CommentLike, model.like_count)
    }
}
