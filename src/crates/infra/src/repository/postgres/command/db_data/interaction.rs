use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

use domain::interaction::Interaction;

// 主键 (user_id, kind, target_id) 保证同一关系只有一行
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, DeriveEntityModel, Default)]
#[sea_orm(table_name = "interaction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[sea_orm(column_type = "BigInteger")]
    pub user_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub kind: String,
    #[sea_orm(primary_key, auto_increment = false)]
    #[sea_orm(column_type = "BigInteger")]
    pub target_id: i64,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Interaction> for ActiveModel {
    fn from(interaction: &Interaction) -> Self {
        Self {
            user_id: Set(interaction.user_id.as_i64()),
            kind: Set(interaction.kind.name().to_string()),
            target_id: Set(interaction.target_id),
            created_at: Set(interaction.created_at),
        }
    }
}
