//! HTTP API layer for myvote-rs.
//!
//! - **Endpoints**: accounts, polls, voting, following, feeds and search
//! - **Extractors**: authenticated and optional users
//! - **Middleware**: bearer-token authentication
//! - **Responses**: data envelopes, action results and pages
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;

use axum::Router;

/// The full application router: endpoints, token authentication and state.
pub fn app(state: AppState) -> Router {
    router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .with_state(state)
}
