//! Add the weighted full-text search index for polls.
//!
//! `PostgreSQL` only. Other backends fall back to LIKE matching at query time.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.get_database_backend() != DatabaseBackend::Postgres {
            return Ok(());
        }

        // Name weighted A, description weighted B
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE INDEX IF NOT EXISTS idx_poll_search
                ON poll
                USING GIN (
                    (setweight(to_tsvector('simple', name), 'A')
                        || setweight(to_tsvector('simple', COALESCE(description, '')), 'B'))
                );
                ",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.get_database_backend() != DatabaseBackend::Postgres {
            return Ok(());
        }

        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS idx_poll_search;")
            .await?;

        Ok(())
    }
}
