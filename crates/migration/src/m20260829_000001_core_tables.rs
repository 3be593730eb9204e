use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Users table.
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::FirstName).string().not_null())
                    .col(ColumnDef::new(Users::LastName).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::Username).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::ImageUrl).string().not_null())
                    .col(ColumnDef::new(Users::PasswordHash).binary().not_null())
                    .col(ColumnDef::new(Users::Salt).binary().not_null())
                    .col(ColumnDef::new(Users::PasswordIterations).integer().not_null())
                    .col(ColumnDef::new(Users::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Favorites table. `book_key` is an opaque external catalog key,
        // deliberately without a local foreign key.
        manager
            .create_table(
                Table::create()
                    .table(Favorites::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Favorites::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Favorites::Status).string().not_null())
                    .col(ColumnDef::new(Favorites::UserId).integer().not_null())
                    .col(ColumnDef::new(Favorites::BookKey).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_favorites_user_id")
                            .from(Favorites::Table, Favorites::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // SQLite cannot represent non-unique indexes as constraints.
        manager
            .create_index(
                Index::create()
                    .name("idx_favorites_user_id")
                    .table(Favorites::Table)
                    .col(Favorites::UserId)
                    .to_owned(),
            )
            .await?;

        // One status per user per book.
        manager
            .create_index(
                Index::create()
                    .name("uq_favorites_user_id_book_key")
                    .table(Favorites::Table)
                    .col(Favorites::UserId)
                    .col(Favorites::BookKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Comments table (reviews).
        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Comments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Comments::Text).string().not_null())
                    .col(ColumnDef::new(Comments::UserRating).integer().not_null())
                    .col(ColumnDef::new(Comments::UserId).integer().not_null())
                    .col(ColumnDef::new(Comments::BookKey).string().not_null())
                    .col(ColumnDef::new(Comments::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comments_user_id")
                            .from(Comments::Table, Comments::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comments_user_id")
                    .table(Comments::Table)
                    .col(Comments::UserId)
                    .to_owned(),
            )
            .await?;

        // Book pages list every review for a key.
        manager
            .create_index(
                Index::create()
                    .name("idx_comments_book_key")
                    .table(Comments::Table)
                    .col(Comments::BookKey)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Comments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Favorites::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Username,
    ImageUrl,
    PasswordHash,
    Salt,
    PasswordIterations,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Favorites {
    Table,
    Id,
    Status,
    UserId,
    BookKey,
}

#[derive(DeriveIden)]
enum Comments {
    Table,
    Id,
    Text,
    UserRating,
    UserId,
    BookKey,
    CreatedAt,
}
