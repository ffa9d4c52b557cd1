//! Vote repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Vote, vote};
use myvote_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, sea_query::Expr,
};

use super::is_unique_violation;

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Check if a user has voted on a poll.
    pub async fn has_voted(&self, poll_id: &str, user_id: &str) -> AppResult<bool> {
        let vote = Vote::find()
            .filter(vote::Column::PollId.eq(poll_id))
            .filter(vote::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(vote.is_some())
    }

    /// Record a vote.
    ///
    /// The `(poll_id, user_id)` unique index is authoritative: a violation
    /// surfaces as [`AppError::AlreadyVoted`].
    pub async fn create(&self, model: vote::ActiveModel) -> AppResult<vote::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::AlreadyVoted
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Vote counts per option of a poll. Options without votes are absent.
    pub async fn count_by_option(&self, poll_id: &str) -> AppResult<HashMap<String, u64>> {
        let rows = Vote::find()
            .select_only()
            .column(vote::Column::OptionId)
            .column_as(Expr::col(vote::Column::Id).count(), "vote_count")
            .filter(vote::Column::PollId.eq(poll_id))
            .group_by(vote::Column::OptionId)
            .into_tuple::<(String, i64)>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(option_id, count)| (option_id, count.max(0) as u64))
            .collect())
    }

    /// Count votes cast by a user.
    pub async fn count_by_user(&self, user_id: &str) -> AppResult<u64> {
        Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
