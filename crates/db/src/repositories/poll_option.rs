//! Poll option repository.

use std::sync::Arc;

use crate::entities::{PollOption, poll_option};
use myvote_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Poll option repository for database operations.
#[derive(Clone)]
pub struct PollOptionRepository {
    db: Arc<DatabaseConnection>,
}

impl PollOptionRepository {
    /// Create a new poll option repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get the options of a poll in submission order.
    pub async fn find_by_poll(&self, poll_id: &str) -> AppResult<Vec<poll_option::Model>> {
        PollOption::find()
            .filter(poll_option::Column::PollId.eq(poll_id))
            .order_by_asc(poll_option::Column::Position)
            .order_by_asc(poll_option::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an option only if it belongs to the given poll.
    pub async fn find_in_poll(
        &self,
        poll_id: &str,
        option_id: &str,
    ) -> AppResult<Option<poll_option::Model>> {
        PollOption::find_by_id(option_id)
            .filter(poll_option::Column::PollId.eq(poll_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
