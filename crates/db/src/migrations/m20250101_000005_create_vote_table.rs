//! Create vote table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vote::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Vote::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Vote::OptionId).string_len(32).not_null())
                    .col(ColumnDef::new(Vote::PollId).string_len(32).not_null())
                    .col(ColumnDef::new(Vote::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Vote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_option")
                            .from(Vote::Table, Vote::OptionId)
                            .to(PollOption::Table, PollOption::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_poll")
                            .from(Vote::Table, Vote::PollId)
                            .to(Poll::Table, Poll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_user")
                            .from(Vote::Table, Vote::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (poll_id, user_id) - one vote per user per poll
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_poll_id_user_id")
                    .table(Vote::Table)
                    .col(Vote::PollId)
                    .col(Vote::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: option_id (for per-option counts)
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_option_id")
                    .table(Vote::Table)
                    .col(Vote::OptionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Vote {
    Table,
    Id,
    OptionId,
    PollId,
    UserId,
    CreatedAt,
}

#[derive(Iden)]
enum PollOption {
    Table,
    Id,
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
