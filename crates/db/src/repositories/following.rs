//! Following repository.

use std::sync::Arc;

use crate::entities::{Following, following};
use myvote_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QuerySelect,
};

use super::is_unique_violation;

/// Following repository for database operations.
#[derive(Clone)]
pub struct FollowingRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowingRepository {
    /// Create a new following repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a following relationship by follower and followee.
    pub async fn find_by_pair(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<Option<following::Model>> {
        Following::find()
            .filter(following::Column::FollowerId.eq(follower_id))
            .filter(following::Column::FolloweeId.eq(followee_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user is following another user.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(follower_id, followee_id).await?.is_some())
    }

    /// Create a new following relationship.
    ///
    /// An already existing pair surfaces as [`AppError::Conflict`].
    pub async fn create(&self, model: following::ActiveModel) -> AppResult<following::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Already following".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Delete a following relationship by pair.
    ///
    /// Returns whether an edge was removed.
    pub async fn delete_by_pair(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        let following = self.find_by_pair(follower_id, followee_id).await?;
        if let Some(f) = following {
            f.delete(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Get the IDs of every user that `user_id` follows.
    pub async fn find_followee_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        Following::find()
            .filter(following::Column::FollowerId.eq(user_id))
            .select_only()
            .column(following::Column::FolloweeId)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count followers of a user.
    pub async fn count_followers(&self, user_id: &str) -> AppResult<u64> {
        Following::find()
            .filter(following::Column::FolloweeId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count following of a user.
    pub async fn count_following(&self, user_id: &str) -> AppResult<u64> {
        Following::find()
            .filter(following::Column::FollowerId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_following(id: &str, follower_id: &str, followee_id: &str) -> following::Model {
        following::Model {
            id: id.to_string(),
            follower_id: follower_id.to_string(),
            followee_id: followee_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_pair_found() {
        let following = create_test_following("f1", "user1", "user2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[following.clone()]])
                .into_connection(),
        );

        let repo = FollowingRepository::new(db);
        let result = repo.find_by_pair("user1", "user2").await.unwrap();

        let found = result.unwrap();
        assert_eq!(found.follower_id, "user1");
        assert_eq!(found.followee_id, "user2");
    }

    #[tokio::test]
    async fn test_is_following_false() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<following::Model>::new()])
                .into_connection(),
        );

        let repo = FollowingRepository::new(db);
        assert!(!repo.is_following("user1", "user2").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_by_pair_existing() {
        let following = create_test_following("f1", "user1", "user2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[following]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = FollowingRepository::new(db);
        assert!(repo.delete_by_pair("user1", "user2").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_by_pair_missing_is_noop() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<following::Model>::new()])
                .into_connection(),
        );

        let repo = FollowingRepository::new(db);
        assert!(!repo.delete_by_pair("user1", "user2").await.unwrap());
    }

    #[tokio::test]
    async fn test_count_followers() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(3))
                }]])
                .into_connection(),
        );

        let repo = FollowingRepository::new(db);
        assert_eq!(repo.count_followers("user1").await.unwrap(), 3);
    }
}
