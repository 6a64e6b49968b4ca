use crate::entities::prelude::*;
use crate::entities::{reviews, titles, users};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Categories)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Genres)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Titles)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(TitleGenres)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Reviews are created by hand: the score check constraint and the
        // (title_id, author_id) uniqueness are the storage-level backstop
        // behind the application validators.
        manager
            .create_table(
                Table::create()
                    .table(Reviews)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(reviews::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(reviews::Column::TitleId).integer().not_null())
                    .col(
                        ColumnDef::new(reviews::Column::AuthorId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(reviews::Column::Text).text().not_null())
                    .col(
                        ColumnDef::new(reviews::Column::Score)
                            .integer()
                            .not_null()
                            .check(Expr::col(reviews::Column::Score).between(1, 10)),
                    )
                    .col(
                        ColumnDef::new(reviews::Column::CreatedAt)
                            .text()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Reviews, reviews::Column::TitleId)
                            .to(Titles, titles::Column::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Reviews, reviews::Column::AuthorId)
                            .to(Users, users::Column::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_title_author")
                    .table(Reviews)
                    .col(reviews::Column::TitleId)
                    .col(reviews::Column::AuthorId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Comments)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Comments).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Reviews).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TitleGenres).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Titles).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Genres).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
