//! Home feed and explore endpoints.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use myvote_common::AppResult;

use crate::{
    endpoints::{polls::PollResponse, users::PageQuery},
    extractors::MaybeAuthUser,
    middleware::AppState,
    response::{ApiResponse, PageResponse},
};

/// Polls by followed users. `data` is `null` for anonymous visitors.
async fn home(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Option<PageResponse<PollResponse>>>> {
    let feed = state
        .feed_service
        .home_feed(viewer.principal().as_ref(), query.number())
        .await?;

    Ok(ApiResponse::ok(
        feed.map(|page| PageResponse::from_page(page, PollResponse::from)),
    ))
}

/// Every poll, newest first.
async fn explore(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<PageResponse<PollResponse>>> {
    let page = state.feed_service.explore(query.number()).await?;
    Ok(ApiResponse::ok(PageResponse::from_page(page, PollResponse::from)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/feed", get(home))
        .route("/explore", get(explore))
}
