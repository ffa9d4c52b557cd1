//! Poll and voting endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use myvote_common::{AppError, AppResult};
use myvote_core::{CreatePollInput, OptionTally, PollDetail, PollView};
use myvote_db::entities::poll;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ActionResponse, ApiResponse},
};

/// Poll summary as shown in listings.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub created_at: String,
}

impl From<poll::Model> for PollResponse {
    fn from(poll: poll::Model) -> Self {
        Self {
            id: poll.id,
            name: poll.name,
            description: poll.description,
            owner_id: poll.owner_id,
            created_at: poll.created_at.to_rfc3339(),
        }
    }
}

/// An option with its tally.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionResponse {
    pub id: String,
    pub text: String,
    pub votes: u64,
}

impl From<OptionTally> for OptionResponse {
    fn from(tally: OptionTally) -> Self {
        Self {
            id: tally.option.id,
            text: tally.option.text,
            votes: tally.votes,
        }
    }
}

/// Full poll view.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDetailResponse {
    #[serde(flatten)]
    pub poll: PollResponse,
    pub options: Vec<OptionResponse>,
    pub total_votes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_voted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_owner: Option<bool>,
}

impl From<PollDetail> for PollDetailResponse {
    fn from(detail: PollDetail) -> Self {
        Self {
            poll: detail.poll.into(),
            options: detail.options.into_iter().map(Into::into).collect(),
            total_votes: detail.total_votes,
            has_voted: None,
            is_owner: None,
        }
    }
}

impl From<PollView> for PollDetailResponse {
    fn from(view: PollView) -> Self {
        Self {
            has_voted: Some(view.has_voted),
            is_owner: Some(view.is_owner),
            ..Self::from(view.detail)
        }
    }
}

fn poll_path(poll_id: &str) -> String {
    format!("/polls/{poll_id}")
}

/// Create poll request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Create a poll and send the client to it.
async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreatePollRequest>,
) -> AppResult<ActionResponse<PollDetailResponse>> {
    let input = CreatePollInput {
        name: req.name,
        description: req.description,
        options: req.options,
    };

    let detail = state
        .poll_service
        .create_poll(&user.principal(), input)
        .await?;

    Ok(ActionResponse::redirect(poll_path(&detail.poll.id)).with_data(detail.into()))
}

/// View a poll with its tallies.
async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> AppResult<ApiResponse<PollDetailResponse>> {
    let view = state
        .vote_service
        .view_poll(&poll_id, viewer.principal().as_ref())
        .await?;

    Ok(ApiResponse::ok(view.into()))
}

/// Cast a vote. Business-rule rejections come back as messages on the
/// action, not as error responses.
async fn vote(
    user: AuthUser,
    State(state): State<AppState>,
    Path((poll_id, option_id)): Path<(String, String)>,
) -> AppResult<ActionResponse> {
    let action = ActionResponse::redirect(poll_path(&poll_id));

    match state
        .vote_service
        .cast_vote(&poll_id, &option_id, &user.principal())
        .await
    {
        Ok(_) => Ok(action.success("Vote recorded successfully!")),
        Err(AppError::AlreadyVoted) => Ok(action.error("You've already voted on this poll!")),
        Err(AppError::OptionNotFound(_)) => Ok(action.error("No such option exists.")),
        Err(e) => Err(e),
    }
}

/// Delete confirmation: the poll about to be removed.
async fn confirm_delete(
    user: AuthUser,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> AppResult<Response> {
    let poll = state.poll_service.get_poll(&poll_id).await?;

    if poll.owner_id != user.0.id {
        return Ok(ActionResponse::redirect("/")
            .warning("You do not have permission to delete this poll.")
            .into_response());
    }

    Ok(ApiResponse::ok(PollResponse::from(poll)).into_response())
}

/// Delete a poll.
async fn delete(
    user: AuthUser,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> AppResult<ActionResponse> {
    let action = ActionResponse::redirect("/");

    match state
        .poll_service
        .delete_poll(&poll_id, &user.principal())
        .await
    {
        Ok(()) => Ok(action.success("Poll deleted.")),
        Err(AppError::PermissionDenied(msg)) => Ok(action.warning(msg)),
        Err(e) => Err(e),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/polls", post(create))
        .route("/polls/{poll_id}", get(show))
        .route("/polls/{poll_id}/vote/{option_id}", get(vote).post(vote))
        .route("/polls/{poll_id}/delete", get(confirm_delete).post(delete))
}
