//! Search endpoints.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use myvote_common::AppResult;
use myvote_core::{RankedPoll, parse_page};
use serde::{Deserialize, Serialize};

use crate::{
    endpoints::{polls::PollResponse, users::UserResponse},
    middleware::AppState,
    response::{ApiResponse, PageResponse},
};

/// Search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search_val: Option<String>,
    pub page: Option<String>,
}

impl SearchQuery {
    fn text(&self) -> &str {
        self.search_val.as_deref().unwrap_or_default()
    }

    fn page(&self) -> u64 {
        parse_page(self.page.as_deref())
    }
}

/// A poll with its relevance score.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPollResponse {
    #[serde(flatten)]
    pub poll: PollResponse,
    pub rank: f32,
}

impl From<RankedPoll> for RankedPollResponse {
    fn from(ranked: RankedPoll) -> Self {
        Self {
            poll: ranked.poll.into(),
            rank: ranked.rank,
        }
    }
}

/// Combined search response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAllResponse {
    pub query: String,
    pub users: PageResponse<UserResponse>,
    pub polls: PageResponse<RankedPollResponse>,
}

/// Top users and polls for a query.
async fn search_all(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<ApiResponse<SearchAllResponse>> {
    let overview = state.search_service.search_all(query.text()).await?;

    Ok(ApiResponse::ok(SearchAllResponse {
        query: overview.query,
        users: PageResponse::from_page(overview.users, UserResponse::from),
        polls: PageResponse::from_page(overview.polls, RankedPollResponse::from),
    }))
}

/// Users whose username contains the query.
async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<ApiResponse<PageResponse<UserResponse>>> {
    let page = state
        .search_service
        .search_users(query.text(), query.page())
        .await?;
    Ok(ApiResponse::ok(PageResponse::from_page(page, UserResponse::from)))
}

/// Polls ranked by relevance.
async fn search_polls(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<ApiResponse<PageResponse<RankedPollResponse>>> {
    let page = state
        .search_service
        .search_polls(query.text(), query.page())
        .await?;
    Ok(ApiResponse::ok(PageResponse::from_page(
        page,
        RankedPollResponse::from,
    )))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search_all))
        .route("/search/users", get(search_users))
        .route("/search/polls", get(search_polls))
}
