use sea_orm_migration::prelude::*;

use crate::m20240101_000001_create_category::Category;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Category: lookup by exact name (non-unique)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_category_name")
                    .table(Category::Table)
                    .col(Category::Name)
                    .to_owned(),
            )
            .await?;

        // Category: default listing order
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_category_create_time")
                    .table(Category::Table)
                    .col(Category::CreateTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_category_create_time").table(Category::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_category_name").table(Category::Table).to_owned())
            .await
    }
}
