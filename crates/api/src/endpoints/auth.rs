//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::post};
use myvote_common::AppResult;
use myvote_core::CreateUserInput;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Signup request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Credentials returned by signup and signin.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: String,
    pub username: String,
    pub token: String,
}

/// Create a new user account.
async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let input = CreateUserInput {
        username: req.username,
        email: req.email,
        password: req.password,
        password_confirmation: req.password_confirmation,
    };

    let user = state.account_service.create_user(input).await?;

    Ok(ApiResponse::ok(SessionResponse {
        id: user.id,
        username: user.username,
        token: user.token.unwrap_or_default(),
    }))
}

/// Signin request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninRequest {
    pub username: String,
    pub password: String,
}

/// Sign in to an existing account.
async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let user = state
        .account_service
        .authenticate(&req.username, &req.password)
        .await?;

    // Issue a token for accounts that somehow lack one
    let token = match user.token {
        Some(token) => token,
        None => state.account_service.regenerate_token(&user.id).await?,
    };

    Ok(ApiResponse::ok(SessionResponse {
        id: user.id,
        username: user.username,
        token,
    }))
}

/// Regenerate token response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateTokenResponse {
    pub token: String,
}

/// Regenerate the authentication token.
async fn regenerate_token(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<RegenerateTokenResponse>> {
    let new_token = state.account_service.regenerate_token(&user.id).await?;

    Ok(ApiResponse::ok(RegenerateTokenResponse { token: new_token }))
}

/// Signout response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignoutResponse {
    pub ok: bool,
}

/// Sign out (invalidate current token by regenerating).
async fn signout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<SignoutResponse>> {
    state.account_service.regenerate_token(&user.id).await?;
    tracing::debug!(user_id = %user.id, "Signed out");

    Ok(ApiResponse::ok(SignoutResponse { ok: true }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
        .route("/regenerate-token", post(regenerate_token))
}
