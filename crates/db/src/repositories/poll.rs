//! Poll repository.

use std::sync::Arc;

use crate::entities::{Poll, PollOption, Vote, poll, poll_option, vote};
use myvote_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseBackend,
    DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Statement, TransactionTrait,
    prelude::DateTimeWithTimeZone,
    sea_query::{Expr, LikeExpr, extension::postgres::PgExpr},
};

use super::escape_like;

/// Weighted document: name as weight A, description as weight B.
const POLL_DOCUMENT: &str = "setweight(to_tsvector('simple', name), 'A') \
     || setweight(to_tsvector('simple', COALESCE(description, '')), 'B')";

/// A poll row together with its full-text relevance.
#[allow(missing_docs)]
#[derive(Debug, Clone, FromQueryResult)]
pub struct RankedPollRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub created_at: DateTimeWithTimeZone,
    pub rank: f32,
}

impl RankedPollRow {
    /// Split into the poll model and its rank.
    #[must_use]
    pub fn into_parts(self) -> (poll::Model, f32) {
        (
            poll::Model {
                id: self.id,
                name: self.name,
                description: self.description,
                owner_id: self.owner_id,
                created_at: self.created_at,
            },
            self.rank,
        )
    }
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    num_items: i64,
}

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Backend of the underlying connection.
    #[must_use]
    pub fn backend(&self) -> DatabaseBackend {
        self.db.get_database_backend()
    }

    /// Find a poll by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a poll by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<poll::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PollNotFound(id.to_string()))
    }

    /// Insert a poll and its options in one transaction.
    ///
    /// Either the poll and every option are stored, or nothing is.
    pub async fn create_with_options(
        &self,
        poll: poll::ActiveModel,
        options: Vec<poll_option::ActiveModel>,
    ) -> AppResult<(poll::Model, Vec<poll_option::Model>)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let poll = poll
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut inserted = Vec::with_capacity(options.len());
        for option in options {
            let option = option
                .insert(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            inserted.push(option);
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((poll, inserted))
    }

    /// Delete a poll with its options and votes in one transaction.
    pub async fn delete_cascade(&self, id: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Vote::delete_many()
            .filter(vote::Column::PollId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        PollOption::delete_many()
            .filter(poll_option::Column::PollId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Poll::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get polls owned by any of `owner_ids`, newest first.
    pub async fn find_by_owners(
        &self,
        owner_ids: &[String],
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<poll::Model>> {
        if owner_ids.is_empty() {
            return Ok(vec![]);
        }

        Poll::find()
            .filter(poll::Column::OwnerId.is_in(owner_ids.to_vec()))
            .order_by_desc(poll::Column::CreatedAt)
            .order_by_desc(poll::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count polls owned by any of `owner_ids`.
    pub async fn count_by_owners(&self, owner_ids: &[String]) -> AppResult<u64> {
        if owner_ids.is_empty() {
            return Ok(0);
        }

        Poll::find()
            .filter(poll::Column::OwnerId.is_in(owner_ids.to_vec()))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all polls, newest first.
    pub async fn find_recent(&self, limit: u64, offset: u64) -> AppResult<Vec<poll::Model>> {
        Poll::find()
            .order_by_desc(poll::Column::CreatedAt)
            .order_by_desc(poll::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all polls.
    pub async fn count_all(&self) -> AppResult<u64> {
        Poll::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count polls owned by a single user.
    pub async fn count_by_owner(&self, owner_id: &str) -> AppResult<u64> {
        Poll::find()
            .filter(poll::Column::OwnerId.eq(owner_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Ranked full-text search using `PostgreSQL` tsvector/tsquery.
    ///
    /// Only rows whose rank reaches `threshold` are returned, ordered by rank,
    /// then newest first.
    pub async fn search_ranked(
        &self,
        query: &str,
        threshold: f32,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<RankedPollRow>> {
        let sql = format!(
            r"
            WITH ranked AS (
                SELECT
                    id, name, description, owner_id, created_at,
                    ts_rank({POLL_DOCUMENT}, plainto_tsquery('simple', $1)) AS rank
                FROM poll
                WHERE ({POLL_DOCUMENT}) @@ plainto_tsquery('simple', $1)
            )
            SELECT id, name, description, owner_id, created_at, rank
            FROM ranked
            WHERE rank >= $2
            ORDER BY rank DESC, created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "
        );

        RankedPollRow::find_by_statement(Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            &sql,
            [
                query.into(),
                threshold.into(),
                (limit as i64).into(),
                (offset as i64).into(),
            ],
        ))
        .all(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count the rows [`Self::search_ranked`] would return without paging.
    pub async fn count_ranked(&self, query: &str, threshold: f32) -> AppResult<u64> {
        let sql = format!(
            r"
            SELECT COUNT(*) AS num_items
            FROM poll
            WHERE ({POLL_DOCUMENT}) @@ plainto_tsquery('simple', $1)
                AND ts_rank({POLL_DOCUMENT}, plainto_tsquery('simple', $1)) >= $2
            "
        );

        let row = CountRow::find_by_statement(Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            &sql,
            [query.into(), threshold.into()],
        ))
        .one(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map_or(0, |r| r.num_items.max(0) as u64))
    }

    /// Get polls whose name or description contains any of `terms`
    /// (case-insensitive), newest first.
    ///
    /// Used as the candidate set when full-text ranking is unavailable.
    /// Postgres folds case with `ILIKE`, which covers non-ASCII letters.
    /// Other backends use plain `LIKE`; `SQLite` folds ASCII letters only.
    pub async fn find_matching_any(&self, terms: &[String]) -> AppResult<Vec<poll::Model>> {
        if terms.is_empty() {
            return Ok(vec![]);
        }

        let postgres = self.backend() == DatabaseBackend::Postgres;
        let contains = |column: poll::Column, pattern: &str| {
            let like = LikeExpr::new(pattern).escape('\\');
            if postgres {
                Expr::col(column).ilike(like)
            } else {
                Expr::col(column).like(like)
            }
        };

        let mut condition = Condition::any();
        for term in terms {
            let pattern = format!("%{}%", escape_like(term));
            condition = condition
                .add(contains(poll::Column::Name, &pattern))
                .add(contains(poll::Column::Description, &pattern));
        }

        Poll::find()
            .filter(condition)
            .order_by_desc(poll::Column::CreatedAt)
            .order_by_desc(poll::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{MockDatabase, MockExecResult, Set};

    fn create_test_poll(id: &str, owner_id: &str, name: &str) -> poll::Model {
        poll::Model {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            owner_id: owner_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn create_test_option(id: &str, poll_id: &str, text: &str, position: i32) -> poll_option::Model {
        poll_option::Model {
            id: id.to_string(),
            poll_id: poll_id.to_string(),
            text: text.to_string(),
            position,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found_returns_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<poll::Model>::new()])
                .into_connection(),
        );

        let repo = PollRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::PollNotFound(id)) if id == "missing"));
    }

    #[tokio::test]
    async fn test_create_with_options() {
        let poll = create_test_poll("p1", "user1", "Best color?");
        let red = create_test_option("o1", "p1", "red", 0);
        let blue = create_test_option("o2", "p1", "blue", 1);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[poll.clone()]])
                .append_query_results([[red.clone()]])
                .append_query_results([[blue.clone()]])
                .into_connection(),
        );

        let repo = PollRepository::new(db);
        let (created, options) = repo
            .create_with_options(
                poll::ActiveModel {
                    id: Set("p1".to_string()),
                    name: Set("Best color?".to_string()),
                    owner_id: Set("user1".to_string()),
                    ..Default::default()
                },
                vec![
                    poll_option::ActiveModel {
                        id: Set("o1".to_string()),
                        poll_id: Set("p1".to_string()),
                        text: Set("red".to_string()),
                        position: Set(0),
                        ..Default::default()
                    },
                    poll_option::ActiveModel {
                        id: Set("o2".to_string()),
                        poll_id: Set("p1".to_string()),
                        text: Set("blue".to_string()),
                        position: Set(1),
                        ..Default::default()
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(created.name, "Best color?");
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].text, "blue");
    }

    #[tokio::test]
    async fn test_delete_cascade() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 2,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 2,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let repo = PollRepository::new(db);
        assert!(repo.delete_cascade("p1").await.is_ok());
    }

    #[tokio::test]
    async fn test_find_by_owners_empty_set_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = PollRepository::new(db);
        assert!(repo.find_by_owners(&[], 5, 0).await.unwrap().is_empty());
        assert_eq!(repo.count_by_owners(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_recent() {
        let newer = create_test_poll("p2", "user1", "Newer");
        let older = create_test_poll("p1", "user2", "Older");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[newer, older]])
                .into_connection(),
        );

        let repo = PollRepository::new(db);
        let result = repo.find_recent(10, 0).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "p2");
    }

    #[tokio::test]
    async fn test_count_all() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(25))
                }]])
                .into_connection(),
        );

        let repo = PollRepository::new(db);
        assert_eq!(repo.count_all().await.unwrap(), 25);
    }

    #[tokio::test]
    async fn test_count_ranked() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(7))
                }]])
                .into_connection(),
        );

        let repo = PollRepository::new(db);
        assert_eq!(repo.count_ranked("color", 0.3).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_find_matching_any_no_terms_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = PollRepository::new(db);
        assert!(repo.find_matching_any(&[]).await.unwrap().is_empty());
    }
}
