//! User profile endpoints.

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::get,
};
use myvote_common::AppResult;
use myvote_core::{Relationship, parse_page};
use myvote_db::entities::user;
use serde::{Deserialize, Serialize};

use crate::{
    endpoints::polls::PollResponse,
    extractors::MaybeAuthUser,
    middleware::AppState,
    response::{ApiResponse, PageResponse},
};

/// Public user fields.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// `page` query parameter. Kept as a string so junk values fall back to page 1
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn number(&self) -> u64 {
        parse_page(self.page.as_deref())
    }
}

/// Profile response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub relationship: &'static str,
    pub followers_count: u64,
    pub following_count: u64,
}

const fn relationship_name(relationship: Relationship) -> &'static str {
    match relationship {
        Relationship::SelfView => "self",
        Relationship::Following => "following",
        Relationship::NotFollowing => "notFollowing",
        Relationship::Anonymous => "anonymous",
    }
}

/// Show a user's profile.
async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let profile = state
        .following_service
        .profile(&username, viewer.principal().as_ref())
        .await?;

    Ok(ApiResponse::ok(ProfileResponse {
        user: profile.user.into(),
        relationship: relationship_name(profile.relationship),
        followers_count: profile.followers_count,
        following_count: profile.following_count,
    }))
}

/// Recent polls response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPollsResponse {
    pub user: UserResponse,
    pub title: String,
    pub polls: PageResponse<PollResponse>,
}

/// List a user's recent polls.
async fn polls(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<UserPollsResponse>> {
    let recent = state
        .feed_service
        .user_recent_polls(&username, query.number())
        .await?;

    Ok(ApiResponse::ok(UserPollsResponse {
        user: recent.user.into(),
        title: recent.title,
        polls: PageResponse::from_page(recent.page, PollResponse::from),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/{username}", get(show))
        .route("/users/{username}/polls", get(polls))
}
