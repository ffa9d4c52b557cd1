//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use myvote_common::FeedConfig;
use myvote_core::{
    AccountService, FeedService, FollowingService, PollService, SearchService, VoteService,
};
use myvote_db::repositories::{
    FollowingRepository, PollOptionRepository, PollRepository, UserRepository, VoteRepository,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub account_service: AccountService,
    pub following_service: FollowingService,
    pub poll_service: PollService,
    pub vote_service: VoteService,
    pub feed_service: FeedService,
    pub search_service: SearchService,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, feed: FeedConfig) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let following_repo = FollowingRepository::new(Arc::clone(&db));
        let poll_repo = PollRepository::new(Arc::clone(&db));
        let option_repo = PollOptionRepository::new(Arc::clone(&db));
        let vote_repo = VoteRepository::new(db);

        let poll_service = PollService::new(poll_repo.clone(), option_repo.clone(), vote_repo.clone());
        let following_service = FollowingService::new(following_repo.clone(), user_repo.clone());

        Self {
            account_service: AccountService::new(
                user_repo.clone(),
                following_repo,
                poll_repo.clone(),
                vote_repo.clone(),
            ),
            vote_service: VoteService::new(vote_repo, poll_repo.clone(), option_repo, poll_service.clone()),
            feed_service: FeedService::new(
                poll_service.clone(),
                following_service.clone(),
                user_repo.clone(),
                feed.clone(),
            ),
            search_service: SearchService::new(poll_repo, user_repo, feed),
            following_service,
            poll_service,
        }
    }
}

/// Authentication middleware.
///
/// A missing or stale token leaves the request anonymous; endpoints that
/// need a user reject it through [`crate::extractors::AuthUser`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.account_service.authenticate_by_token(token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring unusable bearer token"),
        }
    }

    next.run(req).await
}
