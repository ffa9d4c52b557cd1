//! Feed service: home feed, explore and per-user listings.

use std::collections::HashSet;

use myvote_common::{AppResult, FeedConfig};
use myvote_db::{entities::{poll, user}, repositories::UserRepository};

use crate::pagination::Page;
use crate::principal::Principal;
use crate::services::{following::FollowingService, poll::PollService};

/// A user's recent polls with the page title shown above them.
#[derive(Debug, Clone)]
pub struct UserPolls {
    pub user: user::Model,
    pub title: String,
    pub page: Page<poll::Model>,
}

/// Feed service for business logic.
#[derive(Clone)]
pub struct FeedService {
    poll_service: PollService,
    following_service: FollowingService,
    user_repo: UserRepository,
    config: FeedConfig,
}

impl FeedService {
    /// Create a new feed service.
    #[must_use]
    pub const fn new(
        poll_service: PollService,
        following_service: FollowingService,
        user_repo: UserRepository,
        config: FeedConfig,
    ) -> Self {
        Self {
            poll_service,
            following_service,
            user_repo,
            config,
        }
    }

    /// Polls by users the viewer follows, newest first.
    ///
    /// Returns `None` for anonymous viewers. The viewer's own polls are not
    /// part of the feed.
    pub async fn home_feed(
        &self,
        viewer: Option<&Principal>,
        page: u64,
    ) -> AppResult<Option<Page<poll::Model>>> {
        let Some(viewer) = viewer else {
            return Ok(None);
        };

        let followees = self.following_service.followees_of(&viewer.user_id).await?;
        let page = self
            .poll_service
            .list_by_owner_set(&followees, page, self.config.home_page_size)
            .await?;

        Ok(Some(page))
    }

    /// Every poll, newest first.
    pub async fn explore(&self, page: u64) -> AppResult<Page<poll::Model>> {
        self.poll_service
            .list_all(page, self.config.explore_page_size)
            .await
    }

    /// Recent polls by `username`, newest first.
    pub async fn user_recent_polls(&self, username: &str, page: u64) -> AppResult<UserPolls> {
        let user = self.user_repo.get_by_username(username).await?;
        let owners = HashSet::from([user.id.clone()]);
        let page = self
            .poll_service
            .list_by_owner_set(&owners, page, self.config.user_polls_page_size)
            .await?;

        Ok(UserPolls {
            title: format!("Recent polls by {}", user.username),
            user,
            page,
        })
    }
}
