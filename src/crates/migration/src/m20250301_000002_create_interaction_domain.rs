use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 点赞、收藏、关注、评论点赞共用一张关系表，联合主键去重
        manager
            .create_table(
                Table::create()
                    .table(Interaction::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Interaction::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Interaction::Kind).string_len(16).not_null())
                    .col(ColumnDef::new(Interaction::TargetId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Interaction::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(Interaction::UserId)
                            .col(Interaction::Kind)
                            .col(Interaction::TargetId),
                    )
                    .to_owned(),
            )
            .await?;

        // 对账按目标统计
        manager
            .create_index(
                Index::create()
                    .name("idx_interaction_kind_target")
                    .table(Interaction::Table)
                    .col(Interaction::Kind)
                    .col(Interaction::TargetId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Comment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Comment::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Comment::VideoId).big_integer().not_null())
                    .col(ColumnDef::new(Comment::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Comment::Content).text().not_null())
                    .col(
                        ColumnDef::new(Comment::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comment_video_id")
                    .table(Comment::Table)
                    .col(Comment::VideoId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Comment::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Interaction::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Interaction {
    Table,
    UserId,
    Kind,
    TargetId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Comment {
    Table,
    Id,
    VideoId,
    UserId,
    Content,
    CreatedAt,
}
