//! Vote service.
//!
//! A user's relation to a poll only ever moves from "not voted" to "voted";
//! there is no way to change or withdraw a vote.

use chrono::Utc;
use myvote_common::{AppError, AppResult, IdGenerator};
use myvote_db::{
    entities::vote,
    repositories::{PollOptionRepository, PollRepository, VoteRepository},
};
use sea_orm::Set;

use crate::principal::Principal;
use crate::services::poll::{PollDetail, PollService};

/// A poll as presented to a particular viewer.
#[derive(Debug, Clone)]
pub struct PollView {
    pub detail: PollDetail,
    /// Anonymous viewers always count as having voted.
    pub has_voted: bool,
    pub is_owner: bool,
}

/// Vote service for business logic.
#[derive(Clone)]
pub struct VoteService {
    vote_repo: VoteRepository,
    poll_repo: PollRepository,
    option_repo: PollOptionRepository,
    poll_service: PollService,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(
        vote_repo: VoteRepository,
        poll_repo: PollRepository,
        option_repo: PollOptionRepository,
        poll_service: PollService,
    ) -> Self {
        Self {
            vote_repo,
            poll_repo,
            option_repo,
            poll_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Whether `viewer` has voted on the poll. Anonymous viewers are treated
    /// as having voted so that no voting controls are offered to them.
    pub async fn has_voted(&self, poll_id: &str, viewer: Option<&Principal>) -> AppResult<bool> {
        match viewer {
            None => Ok(true),
            Some(principal) => self.vote_repo.has_voted(poll_id, &principal.user_id).await,
        }
    }

    /// Cast a vote.
    ///
    /// Checks run in this order: the poll exists, the voter has not voted on
    /// it yet, the option belongs to the poll.
    pub async fn cast_vote(
        &self,
        poll_id: &str,
        option_id: &str,
        voter: &Principal,
    ) -> AppResult<vote::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;

        if self.vote_repo.has_voted(&poll.id, &voter.user_id).await? {
            tracing::debug!(poll_id = %poll.id, user_id = %voter.user_id, "Rejected second vote");
            return Err(AppError::AlreadyVoted);
        }

        let option = self
            .option_repo
            .find_in_poll(&poll.id, option_id)
            .await?
            .ok_or_else(|| AppError::OptionNotFound(option_id.to_string()))?;

        let model = vote::ActiveModel {
            id: Set(self.id_gen.generate()),
            option_id: Set(option.id.clone()),
            poll_id: Set(poll.id.clone()),
            user_id: Set(voter.user_id.clone()),
            created_at: Set(Utc::now().into()),
        };

        // The unique index settles races between the check above and this insert
        let vote = self.vote_repo.create(model).await?;
        tracing::info!(poll_id = %poll.id, option_id = %option.id, user_id = %voter.user_id, "Vote recorded");
        Ok(vote)
    }

    /// Load a poll with tallies plus the viewer's vote and ownership status.
    pub async fn view_poll(&self, poll_id: &str, viewer: Option<&Principal>) -> AppResult<PollView> {
        let detail = self.poll_service.get_poll_detail(poll_id).await?;
        let has_voted = self.has_voted(&detail.poll.id, viewer).await?;
        let is_owner = viewer.is_some_and(|p| p.user_id == detail.poll.owner_id);

        Ok(PollView {
            detail,
            has_voted,
            is_owner,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use myvote_db::entities::{poll, poll_option};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_poll(id: &str, owner_id: &str) -> poll::Model {
        poll::Model {
            id: id.to_string(),
            name: "Best color?".to_string(),
            description: None,
            owner_id: owner_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn create_test_vote(poll_id: &str, option_id: &str, user_id: &str) -> vote::Model {
        vote::Model {
            id: "v1".to_string(),
            option_id: option_id.to_string(),
            poll_id: poll_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn empty() -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
    }

    fn conn(db: MockDatabase) -> Arc<sea_orm::DatabaseConnection> {
        Arc::new(db.into_connection())
    }

    fn create_service(vote_db: MockDatabase, poll_db: MockDatabase, option_db: MockDatabase) -> VoteService {
        let poll_service = PollService::new(
            PollRepository::new(conn(empty())),
            PollOptionRepository::new(conn(empty())),
            VoteRepository::new(conn(empty())),
        );
        VoteService::new(
            VoteRepository::new(conn(vote_db)),
            PollRepository::new(conn(poll_db)),
            PollOptionRepository::new(conn(option_db)),
            poll_service,
        )
    }

    #[tokio::test]
    async fn test_anonymous_has_voted() {
        let service = create_service(empty(), empty(), empty());
        assert!(service.has_voted("p1", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_cast_vote_missing_poll() {
        let service = create_service(
            empty(),
            empty().append_query_results([Vec::<poll::Model>::new()]),
            empty(),
        );
        let bob = Principal::new("u2", "bob");

        let result = service.cast_vote("nope", "o1", &bob).await;
        assert!(matches!(result, Err(AppError::PollNotFound(_))));
    }

    #[tokio::test]
    async fn test_cast_vote_twice_is_rejected() {
        let service = create_service(
            empty().append_query_results([[create_test_vote("p1", "o1", "u2")]]),
            empty().append_query_results([[create_test_poll("p1", "u1")]]),
            empty(),
        );
        let bob = Principal::new("u2", "bob");

        let result = service.cast_vote("p1", "o2", &bob).await;
        assert!(matches!(result, Err(AppError::AlreadyVoted)));
    }

    #[tokio::test]
    async fn test_already_voted_wins_over_bad_option() {
        let service = create_service(
            empty().append_query_results([[create_test_vote("p1", "o1", "u2")]]),
            empty().append_query_results([[create_test_poll("p1", "u1")]]),
            empty(),
        );
        let bob = Principal::new("u2", "bob");

        let result = service.cast_vote("p1", "not-an-option", &bob).await;
        assert!(matches!(result, Err(AppError::AlreadyVoted)));
    }

    #[tokio::test]
    async fn test_cast_vote_unknown_option() {
        let service = create_service(
            empty().append_query_results([Vec::<vote::Model>::new()]),
            empty().append_query_results([[create_test_poll("p1", "u1")]]),
            empty().append_query_results([Vec::<poll_option::Model>::new()]),
        );
        let bob = Principal::new("u2", "bob");

        let result = service.cast_vote("p1", "o9", &bob).await;
        assert!(matches!(result, Err(AppError::OptionNotFound(id)) if id == "o9"));
    }

    #[tokio::test]
    async fn test_cast_vote_success() {
        let option = poll_option::Model {
            id: "o1".to_string(),
            poll_id: "p1".to_string(),
            text: "red".to_string(),
            position: 0,
            created_at: Utc::now().into(),
        };
        let service = create_service(
            empty()
                .append_query_results([Vec::<vote::Model>::new()])
                .append_query_results([[create_test_vote("p1", "o1", "u2")]]),
            empty().append_query_results([[create_test_poll("p1", "u1")]]),
            empty().append_query_results([[option]]),
        );
        let bob = Principal::new("u2", "bob");

        let vote = service.cast_vote("p1", "o1", &bob).await.unwrap();
        assert_eq!(vote.option_id, "o1");
        assert_eq!(vote.user_id, "u2");
    }
}
