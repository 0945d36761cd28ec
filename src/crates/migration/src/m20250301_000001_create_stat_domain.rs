use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 视频计数，所有计数默认 0
        manager
            .create_table(
                Table::create()
                    .table(VideoStat::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VideoStat::VideoId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(&mut counter(VideoStat::PlayCount))
                    .col(&mut counter(VideoStat::LikeCount))
                    .col(&mut counter(VideoStat::CommentCount))
                    .col(&mut counter(VideoStat::ShareCount))
                    .col(&mut counter(VideoStat::FavoriteCount))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CommentStat::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommentStat::CommentId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(&mut counter(CommentStat::LikeCount))
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommentStat::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VideoStat::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn counter<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .big_integer()
        .not_null()
        .default(0)
        .to_owned()
}

#[derive(DeriveIden)]
enum VideoStat {
    Table,
    VideoId,
    PlayCount,
    LikeCount,
    CommentCount,
    ShareCount,
    FavoriteCount,
}

#[derive(DeriveIden)]
enum CommentStat {
    Table,
    CommentId,
    LikeCount,
}
