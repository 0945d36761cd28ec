use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserBehavior::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserBehavior::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserBehavior::UserId).big_integer().not_null())
                    .col(ColumnDef::new(UserBehavior::VideoId).big_integer().not_null())
                    .col(
                        ColumnDef::new(UserBehavior::BehaviorType)
                            .small_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserBehavior::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 历史查询按用户、行为、时间过滤
        manager
            .create_index(
                Index::create()
                    .name("idx_user_behavior_user_type_time")
                    .table(UserBehavior::Table)
                    .col(UserBehavior::UserId)
                    .col(UserBehavior::BehaviorType)
                    .col(UserBehavior::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserBehavior::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum UserBehavior {
    Table,
    Id,
    UserId,
    VideoId,
    BehaviorType,
    CreatedAt,
}
