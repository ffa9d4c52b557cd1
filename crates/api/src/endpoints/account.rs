//! Account endpoints for the signed-in user.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use myvote_common::AppResult;
use myvote_core::{ChangeEmailInput, ChangePasswordInput};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ActionResponse, ApiResponse},
};

/// Account overview response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOverviewResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
    pub followers_count: u64,
    pub following_count: u64,
    pub polls_count: u64,
    pub votes_count: u64,
}

/// Account overview.
async fn overview(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<AccountOverviewResponse>> {
    let overview = state.account_service.get_overview(&user.principal()).await?;

    Ok(ApiResponse::ok(AccountOverviewResponse {
        id: overview.user.id,
        username: overview.user.username,
        email: overview.user.email,
        created_at: overview.user.created_at.to_rfc3339(),
        followers_count: overview.followers_count,
        following_count: overview.following_count,
        polls_count: overview.polls_count,
        votes_count: overview.votes_count,
    }))
}

/// Change password request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}

/// Change the password.
async fn change_password(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<ActionResponse> {
    state
        .account_service
        .change_password(
            &user.principal(),
            ChangePasswordInput {
                old_password: req.old_password,
                new_password: req.new_password,
                new_password_confirmation: req.new_password_confirmation,
            },
        )
        .await?;

    Ok(ActionResponse::redirect("/account").success("Your password was changed."))
}

/// Change email request.
#[derive(Debug, Deserialize)]
pub struct ChangeEmailRequest {
    pub email: String,
    pub password: String,
}

/// Change the email address.
async fn change_email(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ChangeEmailRequest>,
) -> AppResult<ActionResponse> {
    state
        .account_service
        .change_email(
            &user.principal(),
            ChangeEmailInput {
                email: req.email,
                password: req.password,
            },
        )
        .await?;

    Ok(ActionResponse::redirect("/account").success("Your email was changed."))
}

/// Delete account request.
#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub password: String,
}

/// Delete the account with everything it owns.
async fn delete_account(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<DeleteAccountRequest>,
) -> AppResult<ActionResponse> {
    state
        .account_service
        .delete_user(&user.principal(), &req.password)
        .await?;

    Ok(ActionResponse::redirect("/").success("Your account was deleted."))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/account", get(overview))
        .route("/account/password", post(change_password))
        .route("/account/email", post(change_email))
        .route("/account/delete", post(delete_account))
}
