//! API endpoints.

mod account;
mod auth;
mod feed;
mod following;
mod polls;
mod search;
mod users;

use axum::Router;
use myvote_common::AppError;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(account::router())
        .merge(polls::router())
        .merge(feed::router())
        .merge(users::router())
        .merge(search::router())
        .merge(following::router())
        .fallback(not_found)
}

async fn not_found() -> AppError {
    AppError::NotFound("No such page".to_string())
}
