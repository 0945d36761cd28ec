use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{NotSet, Set};
use serde::{Deserialize, Serialize};

use domain::behavior::BehaviorLog;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, DeriveEntityModel, Default)]
#[sea_orm(table_name = "user_behavior")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = true)]
    #[sea_orm(column_type = "BigInteger")]
    pub id: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub user_id: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub video_id: i64,
    pub behavior_type: i16,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&BehaviorLog> for ActiveModel {
    fn from(entry: &BehaviorLog) -> Self {
        Self {
            id: NotSet,
            user_id: Set(entry.user_id.as_i64()),
            video_id: Set(entry.video_id.as_i64()),
            behavior_type: Set(entry.behavior.code()),
            created_at: Set(entry.created_at),
        }
    }
}
