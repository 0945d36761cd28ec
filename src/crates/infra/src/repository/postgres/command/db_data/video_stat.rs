use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use domain::counter::{CounterKind, CounterSnapshot, TargetScope};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, DeriveEntityModel, Default)]
#[sea_orm(table_name = "video_stat")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[sea_orm(column_type = "BigInteger")]
    pub video_id: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub play_count: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub like_count: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub comment_count: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub share_count: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub favorite_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for CounterSnapshot {
    fn from(model: Model) -> Self {
        CounterSnapshot::zeroed(TargetScope::Video, model.video_id)
            .with(CounterKind::Play, model.play_count)
            .with(CounterKind::Like, model.like_count)
            .with(CounterKind::Comment, model.comment_count)
            .with(CounterKind::Share, model.share_count)
            .with(CounterKind::Favorite, model.favorite_count)
    }
}
