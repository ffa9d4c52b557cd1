//! Following endpoints.

use axum::{Json, Router, extract::State, routing::post};
use myvote_common::{AppError, AppResult};
use serde::Deserialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ActionResponse, local_redirect},
};

/// Follow request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    pub user_id: String,
    pub next_url: Option<String>,
}

/// Follow a user.
async fn follow(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FollowRequest>,
) -> AppResult<ActionResponse> {
    let action = ActionResponse::redirect(local_redirect(req.next_url.as_deref()));

    match state
        .following_service
        .follow(&user.principal(), &req.user_id)
        .await
    {
        Ok(_) => Ok(action.success("You are now following this user.")),
        Err(e @ AppError::SelfFollow) => Ok(action.warning(e.to_string())),
        Err(e) => Err(e),
    }
}

/// Unfollow a user.
async fn unfollow(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FollowRequest>,
) -> AppResult<ActionResponse> {
    let action = ActionResponse::redirect(local_redirect(req.next_url.as_deref()));

    match state
        .following_service
        .unfollow(&user.principal(), &req.user_id)
        .await
    {
        Ok(()) => Ok(action.success("You are no longer following this user.")),
        Err(e @ AppError::SelfUnfollow) => Ok(action.warning(e.to_string())),
        Err(e) => Err(e),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/following/create", post(follow))
        .route("/following/delete", post(unfollow))
}
