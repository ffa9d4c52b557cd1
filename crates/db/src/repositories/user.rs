//! User repository.

use std::sync::Arc;

use crate::entities::{Following, Poll, PollOption, User, Vote, following, poll, poll_option, user, vote};
use myvote_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    sea_query::{LikeExpr, Query},
};

use super::{escape_like, is_unique_violation};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find a user by username (case-insensitive).
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::UsernameLower.eq(username.to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by username, returning an error if not found.
    pub async fn get_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.find_by_username(username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))
    }

    /// Find a user by token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    ///
    /// A taken username surfaces as [`AppError::Conflict`].
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("A user with that username already exists.".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a user together with everything that references them.
    ///
    /// Removes, in one transaction: votes cast by the user, votes and options
    /// of the user's polls, the polls, follow edges in both directions and
    /// finally the user row.
    pub async fn delete_cascade(&self, id: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let owned_polls = Query::select()
            .column(poll::Column::Id)
            .from(Poll)
            .and_where(poll::Column::OwnerId.eq(id))
            .to_owned();

        Vote::delete_many()
            .filter(
                Condition::any()
                    .add(vote::Column::UserId.eq(id))
                    .add(vote::Column::PollId.in_subquery(owned_polls.clone())),
            )
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        PollOption::delete_many()
            .filter(poll_option::Column::PollId.in_subquery(owned_polls))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Poll::delete_many()
            .filter(poll::Column::OwnerId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Following::delete_many()
            .filter(
                Condition::any()
                    .add(following::Column::FollowerId.eq(id))
                    .add(following::Column::FolloweeId.eq(id)),
            )
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        User::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn username_contains(query: &str) -> Condition {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        Condition::all().add(user::Column::UsernameLower.like(LikeExpr::new(pattern).escape('\\')))
    }

    /// Search users whose username contains `query` (case-insensitive).
    ///
    /// Ordered by lowercased username, then id.
    pub async fn search_by_username(
        &self,
        query: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user::Model>> {
        User::find()
            .filter(Self::username_contains(query))
            .order_by_asc(user::Column::UsernameLower)
            .order_by_asc(user::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count users whose username contains `query` (case-insensitive).
    pub async fn count_by_username(&self, query: &str) -> AppResult<u64> {
        User::find()
            .filter(Self::username_contains(query))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
