//! Create poll table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Poll::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Poll::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Poll::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Poll::Description).text())
                    .col(ColumnDef::new(Poll::OwnerId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Poll::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_owner")
                            .from(Poll::Table, Poll::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (owner_id, created_at) for the home feed and profile listings
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_owner_id_created_at")
                    .table(Poll::Table)
                    .col(Poll::OwnerId)
                    .col(Poll::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: created_at for explore
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_created_at")
                    .table(Poll::Table)
                    .col(Poll::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Poll::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
    Name,
    Description,
    OwnerId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
